use core::any::Any;

use xb_tree::{XName, ns};
use xb_serial::{
    Context, Member, NamespaceBindings, SerializerOptions, TypeMeta, XSerializer, XmlError, XmlType,
    impl_xml_polymorphic,
};

// -----------------------------------------------------------------------------
// Shapes

trait Shape: Any {
    fn area(&self) -> f64;
}

#[derive(Default)]
struct Circle {
    radius: f64,
    children: Vec<Box<dyn Shape>>,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        3.0 * self.radius * self.radius
    }
}

impl XmlType for Circle {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Radius", |c: &Circle| &c.radius, |c| &mut c.radius).attribute())
            .member(
                Member::new("Children", |c: &Circle| &c.children, |c| &mut c.children)
                    .item::<Circle>()
                    .item::<Square>(),
            )
            .build()
    }
}

#[derive(Default)]
struct Square {
    side: f64,
}

impl Shape for Square {
    fn area(&self) -> f64 {
        self.side * self.side
    }
}

impl XmlType for Square {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Side", |s: &Square| &s.side, |s| &mut s.side).attribute())
            .build()
    }
}

/// Implements `Shape` but is never listed as a variant.
#[derive(Default)]
struct Triangle;

impl Shape for Triangle {
    fn area(&self) -> f64 {
        0.0
    }
}

impl XmlType for Triangle {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>().default_constructor().build()
    }
}

impl_xml_polymorphic!(Shape as "Shape" => [Circle, Square]);

fn as_any(shape: &dyn Shape) -> &dyn Any {
    shape
}

#[test]
fn runtime_type_survives_a_round_trip() {
    let serializer = XSerializer::new::<Box<dyn Shape>>().unwrap();
    let shape: Box<dyn Shape> = Box::new(Circle {
        radius: 2.0,
        children: vec![
            Box::new(Circle {
                radius: 1.0,
                children: Vec::new(),
            }),
            Box::new(Square { side: 3.0 }),
        ],
    });

    let text = serializer
        .to_string(&shape, &Context::none(), &SerializerOptions::compact())
        .unwrap();
    assert!(text.starts_with("<Shape "));
    assert!(text.contains(r#"xsi:type="Circle""#));
    assert!(text.contains(r#"<Children><Circle Radius="1"><Children/></Circle><Square Side="3"/></Children>"#));

    let back: Box<dyn Shape> = serializer.from_str(&text, &Context::none()).unwrap();
    let circle = as_any(&*back).downcast_ref::<Circle>().unwrap();
    assert_eq!(circle.radius, 2.0);
    assert_eq!(circle.children.len(), 2);
    assert!(as_any(&*circle.children[0]).is::<Circle>());
    assert_eq!(circle.children[1].area(), 9.0);
}

#[test]
fn placeholders_are_never_instantiated() {
    let serializer = XSerializer::new::<Box<dyn Shape>>().unwrap();
    let err = serializer
        .from_str::<Box<dyn Shape>>("<Shape/>", &Context::none())
        .err().unwrap();
    assert!(matches!(err.untraced(), XmlError::UnsupportedType(_)));
}

#[test]
fn unknown_markers_are_rejected() {
    let serializer = XSerializer::new::<Box<dyn Shape>>().unwrap();
    let err = serializer
        .from_str::<Box<dyn Shape>>(
            r#"<Shape xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Hexagon"/>"#,
            &Context::none(),
        )
        .err().unwrap();
    assert!(matches!(err.untraced(), XmlError::UnknownTypeName { .. }));
}

#[test]
fn unlisted_variants_are_rejected() {
    let serializer = XSerializer::new::<Box<dyn Shape>>().unwrap();
    let shape: Box<dyn Shape> = Box::new(Triangle);
    let err = serializer
        .serialize(&shape, &Context::none(), &Default::default())
        .unwrap_err();
    assert!(matches!(err.untraced(), XmlError::UnregisteredType(_)));
}

// -----------------------------------------------------------------------------
// Local item names

#[derive(Default)]
struct Canvas {
    shapes: Vec<Box<dyn Shape>>,
}

impl XmlType for Canvas {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(
                Member::new("Shapes", |c: &Canvas| &c.shapes, |c| &mut c.shapes)
                    .item_named::<Circle>("round")
                    .item_named::<Square>("box"),
            )
            .build()
    }
}

#[test]
fn items_take_their_local_names() {
    let serializer = XSerializer::new::<Canvas>().unwrap();
    let canvas = Canvas {
        shapes: vec![
            Box::new(Square { side: 1.0 }),
            Box::new(Circle {
                radius: 0.5,
                children: Vec::new(),
            }),
        ],
    };

    let element = serializer
        .serialize(&canvas, &Context::none(), &Default::default())
        .unwrap();
    let shapes = element.element(&"Shapes".into()).unwrap();
    let names: Vec<&str> = shapes.elements().map(|e| e.name().local_name()).collect();
    assert_eq!(names, ["box", "round"]);
    let marker = XName::new(ns::XSI, "type");
    assert!(shapes.elements().all(|e| e.attribute(&marker).is_none()));

    let back: Canvas = serializer.deserialize(&element, &Context::none()).unwrap();
    assert!(as_any(&*back.shapes[0]).is::<Square>());
    assert!(as_any(&*back.shapes[1]).is::<Circle>());
}

#[derive(Default)]
struct Drawing {
    circles: Vec<Circle>,
}

impl XmlType for Drawing {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .include::<Square>()
            .default_constructor()
            .member(Member::new("Circles", |d: &Drawing| &d.circles, |d| &mut d.circles))
            .build()
    }
}

#[test]
fn item_names_must_resolve_to_the_item_type() {
    let serializer = XSerializer::new::<Drawing>().unwrap();

    let back: Drawing = serializer
        .from_str(r#"<Drawing><Circles><Circle Radius="2"/></Circles></Drawing>"#, &Context::none())
        .unwrap();
    assert_eq!(back.circles.len(), 1);
    assert_eq!(back.circles[0].radius, 2.0);

    let err = serializer
        .from_str::<Drawing>("<Drawing><Circles><Hexagon/></Circles></Drawing>", &Context::none())
        .err().unwrap();
    assert!(matches!(err.untraced(), XmlError::UnknownTypeName { .. }));

    let err = serializer
        .from_str::<Drawing>(r#"<Drawing><Circles><Square Side="3"/></Circles></Drawing>"#, &Context::none())
        .err().unwrap();
    assert!(matches!(err.untraced(), XmlError::InvalidType { .. }));
}

// -----------------------------------------------------------------------------
// Namespaced markers

trait Pet: Any {}

#[derive(Default, Debug, PartialEq)]
struct Dog {
    name: String,
}

impl Pet for Dog {}

impl XmlType for Dog {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .namespace("urn:zoo")
            .default_constructor()
            .member(Member::new("Name", |d: &Dog| &d.name, |d| &mut d.name).attribute())
            .build()
    }
}

impl_xml_polymorphic!(Pet as "Pet" => [Dog]);

#[derive(Default)]
struct Kennel {
    resident: Option<Box<dyn Pet>>,
}

impl XmlType for Kennel {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Resident", |k: &Kennel| &k.resident, |k| &mut k.resident))
            .build()
    }
}

fn kennel() -> Kennel {
    Kennel {
        resident: Some(Box::new(Dog { name: "Rex".into() })),
    }
}

fn resident(kennel: &Kennel) -> &Dog {
    let pet: &dyn Pet = &**kennel.resident.as_ref().unwrap();
    (pet as &dyn Any).downcast_ref::<Dog>().unwrap()
}

#[test]
fn markers_use_bound_prefixes() {
    let serializer = XSerializer::new::<Kennel>().unwrap();
    let mut options = SerializerOptions::compact();
    options.namespaces.bind("z", "urn:zoo");

    let text = serializer.to_string(&kennel(), &Context::none(), &options).unwrap();
    assert!(text.contains(r#"<Resident xsi:type="z:Dog" Name="Rex"/>"#));

    let back: Kennel = serializer.from_str(&text, &Context::none()).unwrap();
    assert_eq!(resident(&back).name, "Rex");
}

#[test]
fn missing_prefixes_are_generated() {
    let serializer = XSerializer::new::<Kennel>().unwrap();
    let options = SerializerOptions {
        namespaces: NamespaceBindings::empty(),
        ..SerializerOptions::compact()
    };

    let text = serializer.to_string(&kennel(), &Context::none(), &options).unwrap();
    assert!(text.contains(r#"xmlns:nss0="urn:zoo""#));
    assert!(text.contains(r#"="nss0:Dog""#));

    let back: Kennel = serializer.from_str(&text, &Context::none()).unwrap();
    assert_eq!(resident(&back).name, "Rex");
}
