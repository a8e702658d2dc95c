use core::any::{Any, TypeId};
use std::cell::RefCell;

use xb_serial::meta::TypeTraitCollection;
use xb_serial::{
    Context, Member, SerializerOptions, Surrogate, TypeMeta, XSerializer, XSerializerBuilder, XmlError,
    XmlType,
};
use xb_tree::{Attribute, Element};

// -----------------------------------------------------------------------------
// Unknown content

#[derive(Default)]
struct Envelope {
    id: i32,
    body: String,
    extra: Vec<Element>,
    extra_attributes: Vec<Attribute>,
}

impl XmlType for Envelope {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Id", |e: &Envelope| &e.id, |e| &mut e.id).attribute())
            .member(Member::new("Body", |e: &Envelope| &e.body, |e| &mut e.body))
            .member(Member::new("Extra", |e: &Envelope| &e.extra, |e| &mut e.extra).any_elements())
            .member(
                Member::new("ExtraAttributes", |e: &Envelope| &e.extra_attributes, |e| {
                    &mut e.extra_attributes
                })
                .any_attributes(),
            )
            .build()
    }
}

const ENVELOPE: &str = r#"<Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" Id="7" Lang="en" xsi:nil="false"><First/><Body>hi</Body><Second n="2">x</Second></Envelope>"#;

#[test]
fn unknown_content_is_collected_in_order() {
    let serializer = XSerializer::new::<Envelope>().unwrap();
    let envelope: Envelope = serializer.from_str(ENVELOPE, &Context::none()).unwrap();

    assert_eq!(envelope.id, 7);
    assert_eq!(envelope.body, "hi");
    let names: Vec<&str> = envelope.extra.iter().map(|e| e.name().local_name()).collect();
    assert_eq!(names, ["First", "Second"]);
    assert_eq!(envelope.extra[1].text(), "x");

    let attributes: Vec<String> = envelope
        .extra_attributes
        .iter()
        .map(|a| a.name.local_name().to_owned())
        .collect();
    assert_eq!(attributes, ["Lang", "nil"]);
}

#[test]
fn unknown_content_is_written_back() {
    let serializer = XSerializer::new::<Envelope>().unwrap();
    let envelope: Envelope = serializer.from_str(ENVELOPE, &Context::none()).unwrap();

    let text = serializer
        .to_string(&envelope, &Context::none(), &SerializerOptions::compact())
        .unwrap();
    let again = xb_tree::parse(&text).unwrap();
    let names: Vec<&str> = again.elements().map(|e| e.name().local_name()).collect();
    assert_eq!(names, ["Body", "First", "Second"]);
    assert_eq!(again.attribute(&"Lang".into()), Some("en"));
    assert_eq!(again.element(&"Second".into()).unwrap().attribute(&"n".into()), Some("2"));

    let back: Envelope = serializer.from_str(&text, &Context::none()).unwrap();
    assert_eq!(back.extra.len(), 2);
    assert_eq!(back.extra_attributes.len(), 2);
}

#[test]
fn unknown_content_is_ignored_without_collectors() {
    let serializer = XSerializer::new::<Ticket>().unwrap();
    let ticket: Ticket = serializer
        .from_str(r#"<Ticket Code="A1" Extra="1"><Owner>ann</Owner><Noise/></Ticket>"#, &Context::none())
        .unwrap();
    assert_eq!(ticket.code, "A1");
    assert_eq!(ticket.owner, "ann");
}

// -----------------------------------------------------------------------------
// Required members

#[derive(Debug, Default)]
struct Ticket {
    code: String,
    owner: String,
}

impl XmlType for Ticket {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Code", |t: &Ticket| &t.code, |t| &mut t.code).attribute().required())
            .member(Member::new("Owner", |t: &Ticket| &t.owner, |t| &mut t.owner).required())
            .build()
    }
}

#[test]
fn required_members() {
    let serializer = XSerializer::new::<Ticket>().unwrap();

    let err = serializer.from_str::<Ticket>("<Ticket/>", &Context::none()).unwrap_err();
    assert!(matches!(err.untraced(), XmlError::MissingAttribute { name, .. } if name.local_name() == "Code"));

    let err = serializer
        .from_str::<Ticket>(r#"<Ticket Code="A1"/>"#, &Context::none())
        .unwrap_err();
    assert!(matches!(err.untraced(), XmlError::MissingElement { name, .. } if name.local_name() == "Owner"));
}

#[test]
fn root_must_match() {
    let serializer = XSerializer::new::<Ticket>().unwrap();

    let err = serializer
        .serialize(&5_i32, &Context::none(), &Default::default())
        .unwrap_err();
    assert!(matches!(err.untraced(), XmlError::InvalidType { .. }));

    let err = serializer
        .from_str::<Ticket>(r#"<Receipt Code="A1"><Owner>ann</Owner></Receipt>"#, &Context::none())
        .unwrap_err();
    assert!(matches!(err.untraced(), XmlError::InvalidType { .. }));
}

// -----------------------------------------------------------------------------
// In place

#[derive(Debug, Default)]
struct Settings {
    level: i32,
    name: String,
}

impl XmlType for Settings {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Level", |s: &Settings| &s.level, |s| &mut s.level).attribute())
            .member(Member::new("Name", |s: &Settings| &s.name, |s| &mut s.name).attribute())
            .build()
    }
}

#[derive(Debug, Default)]
struct Config {
    settings: Box<Settings>,
    servers: Vec<String>,
    fallback: Option<Box<Settings>>,
}

impl XmlType for Config {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Settings", |c: &Config| &c.settings, |c| &mut c.settings).read_only())
            .member(
                Member::new("Servers", |c: &Config| &c.servers, |c| &mut c.servers)
                    .read_only()
                    .item_name("Server"),
            )
            .member(Member::new("Fallback", |c: &Config| &c.fallback, |c| &mut c.fallback).read_only())
            .build()
    }
}

#[test]
fn read_only_members_are_filled_in_place() {
    let serializer = XSerializer::new::<Config>().unwrap();
    let mut config = Config {
        settings: Box::new(Settings {
            level: 1,
            name: "old".into(),
        }),
        servers: vec!["alpha".into()],
        fallback: None,
    };
    let before: *const Settings = &*config.settings;

    let document = xb_tree::parse(
        r#"<Config><Settings Level="3"/><Servers><Server>beta</Server><Server>gamma</Server></Servers></Config>"#,
    )
    .unwrap();
    serializer
        .deserialize_into(&document, &Context::none(), &mut config)
        .unwrap();

    assert!(core::ptr::eq(before, &*config.settings));
    assert_eq!(config.settings.level, 3);
    assert_eq!(config.settings.name, "old");
    assert_eq!(config.servers, ["alpha", "beta", "gamma"]);
}

#[test]
fn empty_read_only_members_cannot_be_filled() {
    let serializer = XSerializer::new::<Config>().unwrap();
    let err = serializer
        .from_str::<Config>(r#"<Config><Fallback Level="2"/></Config>"#, &Context::none())
        .unwrap_err();
    assert!(matches!(err.untraced(), XmlError::NullReadOnlyMember { member, .. } if member == "Fallback"));
}

// -----------------------------------------------------------------------------
// Flatten

#[derive(Default)]
struct Base {
    name: String,
    note: String,
}

impl XmlType for Base {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Name", |b: &Base| &b.name, |b| &mut b.name).attribute())
            .member(Member::new("Note", |b: &Base| &b.note, |b| &mut b.note))
            .build()
    }
}

#[derive(Default)]
struct Derived {
    base: Base,
    name: String,
}

impl XmlType for Derived {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .flatten(|d: &Derived| &d.base, |d| &mut d.base)
            .member(Member::new("Name", |d: &Derived| &d.name, |d| &mut d.name).attribute())
            .build()
    }
}

#[test]
fn direct_members_shadow_flattened_ones() {
    let serializer = XSerializer::new::<Derived>().unwrap();
    let derived = Derived {
        base: Base {
            name: "base".into(),
            note: "kept".into(),
        },
        name: "derived".into(),
    };

    let element = serializer
        .serialize(&derived, &Context::none(), &Default::default())
        .unwrap();
    assert_eq!(element.attribute(&"Name".into()), Some("derived"));
    assert_eq!(element.element(&"Note".into()).unwrap().text(), "kept");

    let back: Derived = serializer.deserialize(&element, &Context::none()).unwrap();
    assert_eq!(back.name, "derived");
    assert_eq!(back.base.name, "");
    assert_eq!(back.base.note, "kept");
}

// -----------------------------------------------------------------------------
// Callbacks

type Log = RefCell<Vec<String>>;

fn record(context: &Context<'_>, line: String) {
    if let Some(log) = context.get::<Log>() {
        log.borrow_mut().push(line);
    }
}

#[derive(Default)]
struct Journal {
    count: i32,
    doubled: i32,
}

impl XmlType for Journal {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Count", |j: &Journal| &j.count, |j| &mut j.count))
            .on_serializing(|j: &Journal, ctx: &Context<'_>| record(ctx, format!("serializing {}", j.count)))
            .on_serialized(|j: &Journal, ctx: &Context<'_>| record(ctx, format!("serialized {}", j.count)))
            .on_deserializing(|j: &mut Journal, ctx: &Context<'_>| {
                record(ctx, format!("deserializing {}", j.count));
            })
            .on_deserialized(|j: &mut Journal, ctx: &Context<'_>| {
                j.doubled = j.count * 2;
                record(ctx, format!("deserialized {}", j.count));
            })
            .build()
    }
}

#[test]
fn callbacks_run_around_members() {
    let serializer = XSerializer::new::<Journal>().unwrap();
    let log = Log::default();
    let context = Context::new(&log);

    let element = serializer
        .serialize(&Journal { count: 5, doubled: 0 }, &context, &Default::default())
        .unwrap();
    let back: Journal = serializer.deserialize(&element, &context).unwrap();

    assert_eq!(back.doubled, 10);
    assert_eq!(
        *log.borrow(),
        ["serializing 5", "serialized 5", "deserializing 0", "deserialized 5"]
    );
}

#[derive(Default)]
struct Bag {
    label: String,
    items: Vec<i32>,
    total: i32,
}

impl Extend<i32> for Bag {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Bag {
    type Item = &'a i32;
    type IntoIter = core::slice::Iter<'a, i32>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl XmlType for Bag {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .with_trait(TypeTraitCollection::sequence::<Bag, i32>())
            .member(Member::new("Label", |b: &Bag| &b.label, |b| &mut b.label).attribute())
            .on_serializing(|b: &Bag, ctx: &Context<'_>| record(ctx, format!("serializing {}", b.items.len())))
            .on_serialized(|b: &Bag, ctx: &Context<'_>| record(ctx, format!("serialized {}", b.items.len())))
            .on_deserializing(|b: &mut Bag, ctx: &Context<'_>| {
                record(ctx, format!("deserializing {}", b.items.len()));
            })
            .on_deserialized(|b: &mut Bag, ctx: &Context<'_>| {
                b.total = b.items.iter().sum();
                record(ctx, format!("deserialized {}", b.items.len()));
            })
            .build()
    }
}

#[test]
fn callbacks_run_around_items() {
    let serializer = XSerializer::new::<Bag>().unwrap();
    let log = Log::default();
    let context = Context::new(&log);
    let bag = Bag {
        label: "red".into(),
        items: vec![1, 2],
        total: 0,
    };

    let element = serializer
        .serialize(&bag, &context, &Default::default())
        .unwrap();
    assert_eq!(element.attribute(&"Label".into()), Some("red"));
    assert_eq!(element.elements().count(), 2);

    let back: Bag = serializer.deserialize(&element, &context).unwrap();
    assert_eq!(back.label, "red");
    assert_eq!(back.items, [1, 2]);
    assert_eq!(back.total, 3);
    assert_eq!(
        *log.borrow(),
        ["serializing 2", "serialized 2", "deserializing 0", "deserialized 2"]
    );
}

#[derive(Default)]
struct Pile {
    note: String,
    items: Vec<i32>,
}

impl Extend<i32> for Pile {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Pile {
    type Item = &'a i32;
    type IntoIter = core::slice::Iter<'a, i32>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl XmlType for Pile {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .with_trait(TypeTraitCollection::sequence::<Pile, i32>())
            .member(Member::new("Note", |p: &Pile| &p.note, |p| &mut p.note))
            .build()
    }
}

#[test]
fn collection_members_live_in_attributes() {
    let err = XSerializer::new::<Pile>().unwrap_err();
    assert!(matches!(err, XmlError::NotSupported(_)));
}

// -----------------------------------------------------------------------------
// Surrogates

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Celsius(f64);

impl XmlType for Celsius {
    fn type_meta() -> TypeMeta {
        TypeMeta::opaque::<Self>().with_name("celsius")
    }
}

struct Thermometer;

impl Surrogate for Thermometer {
    fn supports(&self, meta: &TypeMeta) -> bool {
        meta.type_id() == TypeId::of::<Celsius>()
    }

    fn serialize(&self, value: &dyn Any, meta: &TypeMeta) -> Result<String, XmlError> {
        match value.downcast_ref::<Celsius>() {
            Some(c) => Ok(format!("{}C", c.0)),
            None => Err(XmlError::InvalidValue {
                target: meta.type_path(),
                reason: "not a temperature".into(),
            }),
        }
    }

    fn deserialize(&self, text: &str, meta: &TypeMeta) -> Result<Box<dyn Any>, XmlError> {
        text.trim()
            .strip_suffix('C')
            .and_then(|n| n.parse::<f64>().ok())
            .map(|n| Box::new(Celsius(n)) as Box<dyn Any>)
            .ok_or_else(|| XmlError::InvalidText {
                target: meta.type_path(),
                text: text.into(),
                reason: "expected a number followed by `C`".into(),
            })
    }
}

/// Also claims temperatures, but comes too late to win.
struct Greedy;

impl Surrogate for Greedy {
    fn supports(&self, meta: &TypeMeta) -> bool {
        meta.name() == Some("celsius")
    }

    fn serialize(&self, _: &dyn Any, _: &TypeMeta) -> Result<String, XmlError> {
        Ok("greedy".into())
    }

    fn deserialize(&self, _: &str, meta: &TypeMeta) -> Result<Box<dyn Any>, XmlError> {
        Err(XmlError::UnsupportedType(meta.type_path()))
    }
}

#[derive(Debug, Default, PartialEq)]
struct Weather {
    temperature: Celsius,
}

impl XmlType for Weather {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(
                Member::new("Temperature", |w: &Weather| &w.temperature, |w| &mut w.temperature)
                    .attribute(),
            )
            .build()
    }
}

#[test]
fn first_matching_surrogate_wins() {
    let mut builder = XSerializerBuilder::new();
    builder.register_surrogate(Thermometer).unwrap();
    builder.register_surrogate(Greedy).unwrap();
    builder.register_root_type::<Weather>().unwrap();
    let serializer = builder.build().unwrap();

    let weather = Weather {
        temperature: Celsius(21.5),
    };
    let element = serializer
        .serialize(&weather, &Context::none(), &Default::default())
        .unwrap();
    assert_eq!(element.attribute(&"Temperature".into()), Some("21.5C"));

    let back: Weather = serializer.deserialize(&element, &Context::none()).unwrap();
    assert_eq!(back, weather);
}

#[test]
fn surrogates_must_precede_types() {
    let mut builder = XSerializerBuilder::new();
    builder.register_root_type::<Ticket>().unwrap();
    let err = builder.register_surrogate(Thermometer).unwrap_err();
    assert!(matches!(err, XmlError::InvalidOperation(_)));
}
