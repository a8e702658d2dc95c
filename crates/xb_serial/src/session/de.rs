use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::any::{Any, TypeId};

use xb_tree::{Attribute, Element, XName};

use crate::meta::{CollectionOps, Placement, TypeTraitCollection, TypeTraitPolymorphic, TypeTraitWrapper};
use crate::registry::{CollectionShape, MemberDescriptor, Slot, TypeDescriptor};
use crate::session::{Session, type_marker};
use crate::{Scope, TypeKind, XmlError, type_of};

impl<'r, 'c> Session<'r, 'c> {
    /// Runs `f` with the declarations of `element` in scope.
    pub(crate) fn within<R>(
        &mut self,
        element: &Element,
        f: impl FnOnce(&mut Self) -> Result<R, XmlError>,
    ) -> Result<R, XmlError> {
        let mark = self.namespaces.enter(element);
        let result = f(self);
        self.namespaces.leave(mark);
        result
    }

    /// The type named by the `xsi:type` marker of `element`, if any.
    ///
    /// The local scope is searched before the global one.
    fn marked_type(&self, element: &Element, scope: Option<&Scope>) -> Result<Option<TypeId>, XmlError> {
        let Some(raw) = element.attribute(&type_marker()) else {
            return Ok(None);
        };
        let name = self.namespaces.resolve(raw)?;
        if let Some(found) = scope.and_then(|s| s.resolve_type(&name)) {
            return Ok(Some(found));
        }
        self.registry.global_scope().type_of(&name).map(Some)
    }

    /// Reads `element` as a fresh value, converted to the storage of `slot`.
    pub(crate) fn read_value(
        &mut self,
        element: &Element,
        slot: Slot,
        items: Option<&Scope>,
    ) -> Result<Box<dyn Any>, XmlError> {
        self.within(element, |session| {
            let actual = session.marked_type(element, None)?.unwrap_or(slot.core);
            let value = session.build(element, actual, items)?;
            session.registry.coerce(value, slot.storage)
        })
    }

    /// Creates a value of type `actual` from `element`.
    fn build(
        &mut self,
        element: &Element,
        actual: TypeId,
        items: Option<&Scope>,
    ) -> Result<Box<dyn Any>, XmlError> {
        let registry = self.registry;
        let desc = registry.descriptor(&actual)?;
        log::trace!("reading `{}` as `{}`", element.name(), desc.type_path());
        self.scoped(desc.type_path(), |session| match desc.kind() {
            TypeKind::Surrogate(_) | TypeKind::Scalar | TypeKind::Text => {
                registry.leaf_from_text(actual, &element.text())
            }
            TypeKind::Collection => {
                let ops = desc
                    .meta()
                    .get_trait::<TypeTraitCollection>()
                    .ok_or(XmlError::UnsupportedType(desc.type_path()))?;
                let mut value = ops.create();
                session.fill_items(element, &mut *value, desc, items)?;
                Ok(value)
            }
            TypeKind::Composite => {
                let mut value = desc
                    .meta()
                    .construct()
                    .ok_or(XmlError::UnsupportedType(desc.type_path()))?;
                session.fill_members(element, &mut *value, desc)?;
                Ok(value)
            }
        })
    }

    /// Fills an existing value from `element`, peeling wrappers and slots.
    ///
    /// Returns `false` if an empty wrapper was reached.
    pub(crate) fn fill(
        &mut self,
        element: &Element,
        target: &mut dyn Any,
        items: Option<&Scope>,
    ) -> Result<bool, XmlError> {
        let registry = self.registry;
        let desc = registry.descriptor(&type_of(&*target))?;
        if let Some(wrapper) = desc.meta().get_trait::<TypeTraitWrapper>() {
            let mut filled = false;
            wrapper.write(target, &mut |inner| {
                if let Some(inner) = inner {
                    filled = self.fill(element, inner, items)?;
                }
                Ok(())
            })?;
            return Ok(filled);
        }
        if let Some(slot) = desc.meta().get_trait::<TypeTraitPolymorphic>() {
            let inner = slot
                .view_mut(target)
                .ok_or_else(|| XmlError::invalid_type(desc.type_path(), "a value of another type"))?;
            return self.fill(element, inner, items);
        }
        if let Some(marked) = self.marked_type(element, None)?
            && marked != type_of(&*target)
        {
            return Err(XmlError::invalid_type(
                desc.type_path(),
                registry.type_path(&marked),
            ));
        }
        self.scoped(desc.type_path(), |session| match desc.kind() {
            TypeKind::Collection => session.fill_items(element, target, desc, items),
            TypeKind::Composite => session.fill_members(element, target, desc),
            _ => Err(XmlError::NotSupported(format!(
                "`{}` cannot be filled in place",
                desc.type_path()
            ))),
        })?;
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Composites

    fn fill_members(
        &mut self,
        element: &Element,
        target: &mut dyn Any,
        desc: &'r TypeDescriptor,
    ) -> Result<(), XmlError> {
        let callbacks = &desc.meta().callbacks;
        callbacks.run_deserializing(target, &self.context);
        self.read_fields(element, target, desc)?;
        callbacks.run_deserialized(target, &self.context);
        Ok(())
    }

    fn read_fields(
        &mut self,
        element: &Element,
        target: &mut dyn Any,
        desc: &'r TypeDescriptor,
    ) -> Result<(), XmlError> {
        for member in desc.members() {
            let placement = member.placement();
            if placement == Placement::ELEMENT {
                match element.element(member.name()) {
                    Some(child) => self.read_member(child, target, member, desc)?,
                    None if member.is_required() => {
                        return Err(XmlError::MissingElement {
                            owner: desc.type_path(),
                            name: member.name().clone(),
                        });
                    }
                    None => {}
                }
            } else if placement == Placement::ATTRIBUTE {
                match element.attribute(member.name()) {
                    Some(text) => self.read_leaf(text, target, member, desc)?,
                    None if member.is_required() => {
                        return Err(XmlError::MissingAttribute {
                            owner: desc.type_path(),
                            name: member.name().clone(),
                        });
                    }
                    None => {}
                }
            } else if placement == Placement::TEXT {
                if element.has_text() {
                    self.read_leaf(&element.text(), target, member, desc)?;
                } else if member.is_required() {
                    return Err(XmlError::MissingElement {
                        owner: desc.type_path(),
                        name: member.name().clone(),
                    });
                }
            } else if placement == Placement::ANY_ELEMENTS {
                let unknown = element
                    .elements()
                    .filter(|e| !claims_element(desc, e.name()))
                    .cloned();
                passthrough_mut::<Element>(target, member)?.extend(unknown);
            } else if placement == Placement::ANY_ATTRIBUTES {
                let marker = type_marker();
                let unknown = element
                    .plain_attributes()
                    .filter(|a| a.name != marker && !claims_attribute(desc, &a.name))
                    .cloned();
                passthrough_mut::<Attribute>(target, member)?.extend(unknown);
            }
        }
        Ok(())
    }

    fn read_member(
        &mut self,
        child: &Element,
        target: &mut dyn Any,
        member: &MemberDescriptor,
        desc: &'r TypeDescriptor,
    ) -> Result<(), XmlError> {
        if member.is_read_only() {
            let field = member
                .access
                .get_mut(target)
                .ok_or_else(|| XmlError::invalid_type(desc.type_path(), "a value of another type"))?;
            let filled = self.within(child, |session| session.fill(child, field, member.scope()))?;
            if !filled {
                return Err(XmlError::NullReadOnlyMember {
                    owner: desc.type_path(),
                    member: member.label().into(),
                });
            }
            return Ok(());
        }
        let value = self.read_value(child, member.slot(), member.scope())?;
        self.assign(target, member, desc, value)
    }

    fn read_leaf(
        &mut self,
        text: &str,
        target: &mut dyn Any,
        member: &MemberDescriptor,
        desc: &'r TypeDescriptor,
    ) -> Result<(), XmlError> {
        let slot = member.slot();
        let value = self.registry.leaf_from_text(slot.core, text)?;
        let value = self.registry.coerce(value, slot.storage)?;
        self.assign(target, member, desc, value)
    }

    fn assign(
        &self,
        target: &mut dyn Any,
        member: &MemberDescriptor,
        desc: &'r TypeDescriptor,
        value: Box<dyn Any>,
    ) -> Result<(), XmlError> {
        member.access.set(target, value).map_err(|value| {
            XmlError::invalid_type(
                format!("{}::{}", desc.type_path(), member.label()),
                self.registry.type_path(&type_of(&*value)),
            )
        })
    }

    // -------------------------------------------------------------------------
    // Collections

    /// Reads the attributes of a collection and appends the items of
    /// `element` to it.
    fn fill_items(
        &mut self,
        element: &Element,
        target: &mut dyn Any,
        desc: &'r TypeDescriptor,
        items: Option<&Scope>,
    ) -> Result<(), XmlError> {
        let callbacks = &desc.meta().callbacks;
        callbacks.run_deserializing(target, &self.context);
        self.read_fields(element, target, desc)?;
        self.read_items(element, target, desc, items)?;
        callbacks.run_deserialized(target, &self.context);
        Ok(())
    }

    fn read_items(
        &mut self,
        element: &Element,
        target: &mut dyn Any,
        desc: &'r TypeDescriptor,
        items: Option<&Scope>,
    ) -> Result<(), XmlError> {
        let registry = self.registry;
        let ops = desc
            .meta()
            .get_trait::<TypeTraitCollection>()
            .ok_or(XmlError::UnsupportedType(desc.type_path()))?;
        match (*ops.ops(), desc.collection()) {
            (CollectionOps::Sequence { push, .. }, Some(&CollectionShape::Sequence { item })) => {
                for child in element.elements() {
                    let value = self.within(child, |session| {
                        let actual = match session.marked_type(child, items)? {
                            Some(actual) => actual,
                            None => session.item_type(child.name(), item, items)?,
                        };
                        let value = session.build(child, actual, None)?;
                        registry.coerce(value, item.storage)
                    })?;
                    push(target, value).map_err(|value| {
                        XmlError::invalid_type(desc.type_path(), registry.type_path(&type_of(&*value)))
                    })?;
                }
                Ok(())
            }
            (
                CollectionOps::Dictionary { insert, .. },
                Some(&CollectionShape::Dictionary {
                    key: key_slot,
                    value: value_slot,
                }),
            ) => {
                let entry_name = XName::local("entry");
                for entry in element.elements().filter(|e| e.name() == &entry_name) {
                    let pair = self.within(entry, |session| {
                        session.read_entry(entry, desc, key_slot, value_slot)
                    })?;
                    if let Some((key, value)) = pair {
                        insert(target, key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(XmlError::invalid_operation(format!(
                "`{}` was registered with another collection shape",
                desc.type_path()
            ))),
        }
    }

    /// Reads one dictionary entry. An entry without value was written from
    /// an empty wrapper and is skipped.
    fn read_entry(
        &mut self,
        entry: &Element,
        desc: &'r TypeDescriptor,
        key_slot: Slot,
        value_slot: Slot,
    ) -> Result<Option<(Box<dyn Any>, Box<dyn Any>)>, XmlError> {
        let key_name = XName::local("key");
        let Some(key) = entry.element(&key_name) else {
            return Err(XmlError::MissingElement {
                owner: desc.type_path(),
                name: key_name,
            });
        };
        let Some(value) = entry.element(&XName::local("value")) else {
            log::trace!("skipping an entry of `{}` without value", desc.type_path());
            return Ok(None);
        };
        let key = self.read_value(key, key_slot, None)?;
        let value = self.read_value(value, value_slot, None)?;
        Ok(Some((key, value)))
    }
}

fn claims_element(desc: &TypeDescriptor, name: &XName) -> bool {
    desc.members()
        .iter()
        .any(|m| m.placement() == Placement::ELEMENT && m.name() == name)
}

fn claims_attribute(desc: &TypeDescriptor, name: &XName) -> bool {
    desc.members()
        .iter()
        .any(|m| m.placement() == Placement::ATTRIBUTE && m.name() == name)
}

fn passthrough_mut<'a, T: Any>(
    target: &'a mut dyn Any,
    member: &MemberDescriptor,
) -> Result<&'a mut Vec<T>, XmlError> {
    member
        .access
        .get_mut(target)
        .and_then(|field| field.downcast_mut::<Vec<T>>())
        .ok_or_else(|| XmlError::invalid_type(core::any::type_name::<Vec<T>>(), "a value of another type"))
}
