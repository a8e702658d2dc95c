use std::cell::RefCell;
use std::rc::Rc;

use xb_serial::{Context, Member, SerializerOptions, TypeMeta, XSerializer, XmlError, XmlType};

#[derive(Default)]
struct Node {
    name: String,
    next: Option<Rc<RefCell<Node>>>,
}

impl XmlType for Node {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Name", |n: &Node| &n.name, |n| &mut n.name).attribute())
            .member(Member::new("Next", |n: &Node| &n.next, |n| &mut n.next))
            .build()
    }
}

fn node(name: &str) -> Rc<RefCell<Node>> {
    Rc::new(RefCell::new(Node {
        name: name.into(),
        next: None,
    }))
}

fn is_circular(err: &XmlError) -> bool {
    matches!(err.untraced(), XmlError::CircularReference(_))
}

#[test]
fn chains_round_trip() {
    let serializer = XSerializer::new::<Node>().unwrap();
    let head = node("a");
    let tail = node("b");
    head.borrow_mut().next = Some(Rc::clone(&tail));

    let text = serializer
        .to_string(&*head.borrow(), &Context::none(), &SerializerOptions::compact())
        .unwrap();
    assert_eq!(text, r#"<Node xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" Name="a"><Next Name="b"/></Node>"#);

    let back: Node = serializer.from_str(&text, &Context::none()).unwrap();
    assert_eq!(back.name, "a");
    let next = back.next.unwrap();
    assert_eq!(next.borrow().name, "b");
    assert!(next.borrow().next.is_none());
}

#[test]
fn self_reference_is_rejected() {
    let serializer = XSerializer::new::<Node>().unwrap();
    let a = node("a");
    a.borrow_mut().next = Some(Rc::clone(&a));

    let result = serializer.serialize(&*a.borrow(), &Context::none(), &Default::default());
    assert!(is_circular(&result.unwrap_err()));

    a.borrow_mut().next = None;
}

#[test]
fn longer_cycles_are_rejected() {
    let serializer = XSerializer::new::<Node>().unwrap();
    let a = node("a");
    let b = node("b");
    let c = node("c");
    a.borrow_mut().next = Some(Rc::clone(&b));
    b.borrow_mut().next = Some(Rc::clone(&c));
    c.borrow_mut().next = Some(Rc::clone(&a));

    let result = serializer.serialize(&*b.borrow(), &Context::none(), &Default::default());
    let err = result.unwrap_err();
    assert!(is_circular(&err));

    c.borrow_mut().next = None;
}

// -----------------------------------------------------------------------------
// Shared values

#[derive(Default)]
struct Leaf {
    value: i32,
}

impl XmlType for Leaf {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Value", |l: &Leaf| &l.value, |l| &mut l.value).attribute())
            .build()
    }
}

#[derive(Default)]
struct Pair {
    left: Rc<Leaf>,
    right: Rc<Leaf>,
}

impl XmlType for Pair {
    fn type_meta() -> TypeMeta {
        TypeMeta::composite::<Self>()
            .default_constructor()
            .member(Member::new("Left", |p: &Pair| &p.left, |p| &mut p.left))
            .member(Member::new("Right", |p: &Pair| &p.right, |p| &mut p.right))
            .build()
    }
}

#[test]
fn shared_values_are_not_cycles() {
    let serializer = XSerializer::new::<Pair>().unwrap();
    let leaf = Rc::new(Leaf { value: 7 });
    let pair = Pair {
        left: Rc::clone(&leaf),
        right: leaf,
    };

    let element = serializer
        .serialize(&pair, &Context::none(), &Default::default())
        .unwrap();
    for name in ["Left", "Right"] {
        let child = element.element(&name.into()).unwrap();
        assert_eq!(child.attribute(&"Value".into()), Some("7"));
    }

    let back: Pair = serializer.deserialize(&element, &Context::none()).unwrap();
    assert_eq!(back.left.value, 7);
    assert_eq!(back.right.value, 7);
}
