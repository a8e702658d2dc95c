use xb_serial::{Context, Member, TypeKind, TypeMeta, XSerializer, XSerializerBuilder, XmlError, XmlType};

#[derive(Default)]
struct Both {
    value: i32,
}

impl XmlType for Both {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Value", |b: &Both| &b.value, |b| &mut b.value).element().attribute())
            .build()
    }
}

#[derive(Default)]
struct Holder {
    both: Option<Box<Both>>,
}

impl XmlType for Holder {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Both", |h: &Holder| &h.both, |h| &mut h.both))
            .build()
    }
}

#[test]
fn placements_are_exclusive() {
    // Rejected while registering, no instance is ever involved.
    let err = XSerializer::new::<Holder>().unwrap_err();
    assert!(matches!(err, XmlError::ConflictingPlacement { member, .. } if member == "Value"));
}

#[derive(Default)]
struct Frozen {
    count: i32,
}

impl XmlType for Frozen {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Count", |f: &Frozen| &f.count, |f| &mut f.count).read_only())
            .build()
    }
}

#[derive(Default, Clone, Copy)]
struct Pixel {
    r: u8,
}

impl XmlType for Pixel {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .value_type()
            .default_constructor()
            .member(Member::new("R", |p: &Pixel| &p.r, |p| &mut p.r).attribute())
            .build()
    }
}

#[derive(Default)]
struct Screen {
    pixel: Pixel,
}

impl XmlType for Screen {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Pixel", |s: &Screen| &s.pixel, |s| &mut s.pixel).read_only())
            .build()
    }
}

#[test]
fn read_only_values_are_rejected() {
    let err = XSerializer::new::<Frozen>().unwrap_err();
    assert!(matches!(err, XmlError::ReadOnlyValueMember { .. }));

    let err = XSerializer::new::<Screen>().unwrap_err();
    assert!(matches!(err, XmlError::ReadOnlyValueMember { member, .. } if member == "Pixel"));
}

#[test]
fn one_root_type() {
    let mut builder = XSerializerBuilder::new();
    builder.register_root_type::<Pixel>().unwrap();
    let err = builder.register_root_type::<Frozen>().unwrap_err();
    assert!(matches!(err, XmlError::InvalidOperation(_)));
}

#[test]
fn wrappers_take_the_kind_of_their_core() {
    let mut builder = XSerializerBuilder::new();
    builder.register_type::<Option<Vec<i32>>>().unwrap();
    let registry = builder.registry();

    let wrapper = registry.get_type::<Option<Vec<i32>>>().unwrap();
    assert!(wrapper.is_wrapper());
    assert!(wrapper.name().is_none());
    assert_eq!(wrapper.kind(), TypeKind::Collection);
    assert_eq!(registry.get_type::<i32>().unwrap().kind(), TypeKind::Scalar);
    assert_eq!(
        registry.get_type::<Vec<i32>>().unwrap().name().unwrap().local_name(),
        "VecOfi32"
    );
}

#[test]
fn value_types_are_copied_in() {
    let serializer = XSerializer::new::<Pixel>().unwrap();
    let element = serializer
        .serialize(&Pixel { r: 200 }, &Context::none(), &Default::default())
        .unwrap();
    assert_eq!(element.attribute(&"R".into()), Some("200"));
    let back: Pixel = serializer.deserialize(&element, &Context::none()).unwrap();
    assert_eq!(back.r, 200);
}
