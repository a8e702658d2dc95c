#![cfg(feature = "auto_register")]

use xb_serial::{Context, Member, TypeMeta, XSerializerBuilder, XmlType, submit_type};

#[derive(Default, Debug, PartialEq)]
struct Gadget {
    serial: u64,
}

impl XmlType for Gadget {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Serial", |g: &Gadget| &g.serial, |g| &mut g.serial).attribute())
            .build()
    }
}

#[derive(Default, Debug, PartialEq)]
struct Widget {
    label: String,
}

impl XmlType for Widget {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .name("widget")
            .default_constructor()
            .member(Member::new("Label", |w: &Widget| &w.label, |w| &mut w.label))
            .build()
    }
}

submit_type!(Gadget, Widget);

#[test]
fn submitted_types_are_registered() {
    let mut builder = XSerializerBuilder::new();
    assert!(builder.auto_register().unwrap());

    let registry = builder.registry();
    assert!(registry.get_type::<Gadget>().is_some());
    let widget = registry.get_type::<Widget>().unwrap();
    assert_eq!(widget.name().unwrap().local_name(), "widget");

    builder.register_root_type::<Gadget>().unwrap();
    let serializer = builder.build().unwrap();
    let element = serializer
        .serialize(&Gadget { serial: 42 }, &Context::none(), &Default::default())
        .unwrap();
    assert_eq!(element.attribute(&"Serial".into()), Some("42"));
}
