use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;

use xb_tree::{Attribute, Element, Node, XName};

use crate::meta::{CollectionOps, Placement, TypeTraitCollection, TypeTraitPolymorphic, TypeTraitWrapper};
use crate::registry::{CollectionShape, MemberDescriptor, Slot, TypeDescriptor};
use crate::session::Session;
use crate::{Scope, TypeKind, XmlError, type_of};

type CoreVisitor<'v, 'r, 'c> =
    dyn FnMut(&mut Session<'r, 'c>, Option<&dyn Any>) -> Result<(), XmlError> + 'v;

impl<'r, 'c> Session<'r, 'c> {
    /// Peels wrappers and polymorphic slots off `value` and hands the value
    /// underneath to `f`, or `None` if a wrapper is empty.
    pub(crate) fn with_core(
        &mut self,
        value: &dyn Any,
        f: &mut CoreVisitor<'_, 'r, 'c>,
    ) -> Result<(), XmlError> {
        let registry = self.registry;
        let desc = registry.descriptor(&type_of(value))?;
        if let Some(wrapper) = desc.meta.get_trait::<TypeTraitWrapper>() {
            return wrapper.read(value, &mut |inner| match inner {
                Some(inner) => self.with_core(inner, f),
                None => f(self, None),
            });
        }
        if let Some(slot) = desc.meta.get_trait::<TypeTraitPolymorphic>() {
            let inner = slot
                .view(value)
                .ok_or_else(|| XmlError::invalid_type(desc.type_path(), "a value of another type"))?;
            if !registry.contains(&type_of(inner)) {
                return Err(XmlError::UnregisteredType(alloc::format!(
                    "a variant of `{}` stored in a slot",
                    desc.type_path()
                )));
            }
            return self.with_core(inner, f);
        }
        f(self, Some(value))
    }

    /// Writes `value`, stored as `slot`, into an element called `name`.
    ///
    /// An empty wrapper produces no element.
    pub(crate) fn write_value(
        &mut self,
        value: &dyn Any,
        slot: Slot,
        name: &XName,
        items: Option<&Scope>,
    ) -> Result<Option<Element>, XmlError> {
        let mut out = None;
        self.with_core(value, &mut |session, core| {
            if let Some(core) = core {
                let marker = session.member_marker(core, slot)?;
                out = Some(session.write_core(core, name, marker, items)?);
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// The override a member needs when its value is not of the declared type.
    fn member_marker(&self, core: &dyn Any, slot: Slot) -> Result<Option<XName>, XmlError> {
        let runtime = type_of(core);
        if runtime == slot.core {
            return Ok(None);
        }
        let registry = self.registry;
        let name = registry
            .global_scope()
            .name_of(&runtime, registry.descriptor(&runtime)?.type_path())?;
        Ok(Some(name.clone()))
    }

    fn write_core(
        &mut self,
        value: &dyn Any,
        name: &XName,
        marker: Option<XName>,
        items: Option<&Scope>,
    ) -> Result<Element, XmlError> {
        let registry = self.registry;
        let desc = registry.descriptor(&type_of(value))?;
        log::trace!("writing `{}` as `{name}`", desc.type_path());

        let mut element = Element::new(name.clone());
        let mark = self.namespaces.open(&mut element, marker.as_ref());
        let result = self.scoped(desc.type_path(), |session| {
            session.write_body(value, desc, &mut element, items)
        });
        self.namespaces.leave(mark);
        result.map(|()| element)
    }

    fn write_body(
        &mut self,
        value: &dyn Any,
        desc: &'r TypeDescriptor,
        element: &mut Element,
        items: Option<&Scope>,
    ) -> Result<(), XmlError> {
        match desc.kind() {
            TypeKind::Surrogate(_) | TypeKind::Scalar | TypeKind::Text => {
                let text = self.registry.leaf_to_text(value)?;
                element.set_text(text);
                Ok(())
            }
            TypeKind::Collection => self.guarded(value, desc.type_path(), |session| {
                let callbacks = &desc.meta().callbacks;
                callbacks.run_serializing(value, &session.context);
                session.write_fields(value, desc, element)?;
                session.write_items(value, desc, element, items)?;
                callbacks.run_serialized(value, &session.context);
                Ok(())
            }),
            TypeKind::Composite if desc.meta().is_value_type() => {
                self.write_members(value, desc, element)
            }
            TypeKind::Composite => self.guarded(value, desc.type_path(), |session| {
                session.write_members(value, desc, element)
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Composites

    fn write_members(
        &mut self,
        value: &dyn Any,
        desc: &'r TypeDescriptor,
        element: &mut Element,
    ) -> Result<(), XmlError> {
        let callbacks = &desc.meta().callbacks;
        callbacks.run_serializing(value, &self.context);
        self.write_fields(value, desc, element)?;
        callbacks.run_serialized(value, &self.context);
        Ok(())
    }

    fn write_fields(
        &mut self,
        value: &dyn Any,
        desc: &'r TypeDescriptor,
        element: &mut Element,
    ) -> Result<(), XmlError> {
        for member in desc.members() {
            let field = member
                .access
                .get(value)
                .ok_or_else(|| XmlError::invalid_type(desc.type_path(), "a value of another type"))?;
            self.write_member(field, member, element)?;
        }
        Ok(())
    }

    fn write_member(
        &mut self,
        field: &dyn Any,
        member: &MemberDescriptor,
        element: &mut Element,
    ) -> Result<(), XmlError> {
        let placement = member.placement();
        if placement == Placement::ELEMENT {
            if let Some(child) = self.write_value(field, member.slot(), member.name(), member.scope())? {
                element.push(child);
            }
        } else if placement == Placement::ATTRIBUTE {
            if let Some(text) = self.leaf_text(field)? {
                self.namespaces.set_attribute(element, member.name().clone(), text);
            }
        } else if placement == Placement::TEXT {
            if let Some(text) = self.leaf_text(field)?
                && !text.is_empty()
            {
                element.push(Node::Text(text));
            }
        } else if placement == Placement::ANY_ELEMENTS {
            let extra = passthrough::<Element>(field)?;
            element.children_mut().extend(extra.iter().cloned().map(Node::Element));
        } else if placement == Placement::ANY_ATTRIBUTES {
            for attribute in passthrough::<Attribute>(field)? {
                if element.attribute(&attribute.name).is_none() {
                    self.namespaces
                        .set_attribute(element, attribute.name.clone(), attribute.value.clone());
                }
            }
        }
        Ok(())
    }

    /// The text of a leaf field, `None` when a wrapper is empty.
    fn leaf_text(&mut self, field: &dyn Any) -> Result<Option<String>, XmlError> {
        let mut out = None;
        self.with_core(field, &mut |session, core| {
            if let Some(core) = core {
                out = Some(session.registry.leaf_to_text(core)?);
            }
            Ok(())
        })?;
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Collections

    fn write_items(
        &mut self,
        value: &dyn Any,
        desc: &'r TypeDescriptor,
        element: &mut Element,
        items: Option<&Scope>,
    ) -> Result<(), XmlError> {
        let ops = desc
            .meta()
            .get_trait::<TypeTraitCollection>()
            .ok_or(XmlError::UnsupportedType(desc.type_path()))?;
        match (*ops.ops(), desc.collection()) {
            (CollectionOps::Sequence { for_each, .. }, Some(&CollectionShape::Sequence { item })) => {
                for_each(value, &mut |entry| {
                    if let Some(child) = self.write_item(entry, item, items)? {
                        element.push(child);
                    }
                    Ok(())
                })
            }
            (
                CollectionOps::Dictionary { for_each, .. },
                Some(&CollectionShape::Dictionary { key, value: slot }),
            ) => for_each(value, &mut |k, v| {
                let mut entry = Element::new(XName::local("entry"));
                let mark = self.namespaces.open(&mut entry, None);
                let result = self.write_entry(&mut entry, k, key, v, slot);
                self.namespaces.leave(mark);
                result?;
                element.push(entry);
                Ok(())
            }),
            _ => Err(XmlError::invalid_operation(alloc::format!(
                "`{}` was registered with another collection shape",
                desc.type_path()
            ))),
        }
    }

    fn write_entry(
        &mut self,
        entry: &mut Element,
        key: &dyn Any,
        key_slot: Slot,
        value: &dyn Any,
        value_slot: Slot,
    ) -> Result<(), XmlError> {
        if let Some(child) = self.write_value(key, key_slot, &XName::local("key"), None)? {
            entry.push(child);
        }
        if let Some(child) = self.write_value(value, value_slot, &XName::local("value"), None)? {
            entry.push(child);
        }
        Ok(())
    }

    /// Items are named after their runtime type, the local name first.
    fn write_item(
        &mut self,
        item: &dyn Any,
        slot: Slot,
        scope: Option<&Scope>,
    ) -> Result<Option<Element>, XmlError> {
        let registry = self.registry;
        let mut out = None;
        self.with_core(item, &mut |session, core| {
            let Some(core) = core else {
                log::trace!("skipping an empty item");
                return Ok(());
            };
            let runtime = type_of(core);
            let path = registry.descriptor(&runtime)?.type_path();
            let name = match scope.and_then(|s| s.resolve_name(&runtime)) {
                Some(name) => name,
                None => registry.global_scope().name_of(&runtime, path)?,
            };
            let marker = if session.item_type(name, slot, scope).ok() == Some(runtime) {
                None
            } else {
                Some(registry.global_scope().name_of(&runtime, path)?.clone())
            };
            out = Some(session.write_core(core, name, marker, None)?);
            Ok(())
        })?;
        Ok(out)
    }
}

fn passthrough<T: Any>(field: &dyn Any) -> Result<&Vec<T>, XmlError> {
    field
        .downcast_ref::<Vec<T>>()
        .ok_or_else(|| XmlError::invalid_type(core::any::type_name::<Vec<T>>(), "a value of another type"))
}
