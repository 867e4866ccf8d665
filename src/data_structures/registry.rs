//! Entity-component registry.
//!
//! Entities are slotmap keys; every component type has its own secondary map.
//! Entities are never removed while a scene is alive (the whole registry is
//! dropped at teardown), so slot order is creation order and every iterator
//! here yields entities in the order they were created.

use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::{
    data_structures::components::{
        LightComponent, MaterialComponent, MeshComponent, RelationComponent, TagComponent,
        TransformComponent,
    },
    error::NginError,
};

new_key_type! {
    /// Opaque handle naming a row across all component tables.
    pub struct Entity;
}

/// A record type with a table in the [`Registry`].
pub trait Component: Sized + 'static {
    fn storage(registry: &Registry) -> &SecondaryMap<Entity, Self>;
    fn storage_mut(registry: &mut Registry) -> &mut SecondaryMap<Entity, Self>;
}

macro_rules! component_table {
    ($component:ty, $field:ident) => {
        impl Component for $component {
            fn storage(registry: &Registry) -> &SecondaryMap<Entity, Self> {
                &registry.$field
            }

            fn storage_mut(registry: &mut Registry) -> &mut SecondaryMap<Entity, Self> {
                &mut registry.$field
            }
        }
    };
}

component_table!(TransformComponent, transforms);
component_table!(MeshComponent, meshes);
component_table!(MaterialComponent, materials);
component_table!(RelationComponent, relations);
component_table!(TagComponent, tags);
component_table!(LightComponent, lights);

#[derive(Debug, Default)]
pub struct Registry {
    entities: SlotMap<Entity, ()>,
    transforms: SecondaryMap<Entity, TransformComponent>,
    meshes: SecondaryMap<Entity, MeshComponent>,
    materials: SecondaryMap<Entity, MaterialComponent>,
    relations: SecondaryMap<Entity, RelationComponent>,
    tags: SecondaryMap<Entity, TagComponent>,
    lights: SecondaryMap<Entity, LightComponent>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Entity {
        self.entities.insert(())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(entity)
    }

    /// All entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys()
    }

    /// Attach `component`, replacing and returning any previous one of the same type.
    pub fn insert<C: Component>(&mut self, entity: Entity, component: C) -> Option<C> {
        if !self.contains(entity) {
            log::warn!("tried to attach a component to unknown entity {:?}", entity);
            return None;
        }
        C::storage_mut(self).insert(entity, component)
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        C::storage(self).get(entity)
    }

    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        C::storage_mut(self).get_mut(entity)
    }

    pub fn has<C: Component>(&self, entity: Entity) -> bool {
        C::storage(self).contains_key(entity)
    }

    /// The component of `entity`, created with its default first if missing.
    /// `None` only for entities this registry does not know.
    pub fn get_or_default<C: Component + Default>(&mut self, entity: Entity) -> Option<&mut C> {
        if !self.contains(entity) {
            return None;
        }
        C::storage_mut(self)
            .entry(entity)
            .map(|entry| entry.or_default())
    }

    /// Entities carrying `C`, in creation order.
    pub fn view<C: Component>(&self) -> impl Iterator<Item = (Entity, &C)> + '_ {
        let storage = C::storage(self);
        self.entities
            .keys()
            .filter_map(move |entity| storage.get(entity).map(|c| (entity, c)))
    }

    /// Make `child`'s transform relative to `parent`'s.
    ///
    /// Both entities need a transform, and `parent` must not already resolve
    /// through `child`; otherwise the chain would never terminate.
    pub fn attach_transform_parent(&mut self, child: Entity, parent: Entity) -> Result<(), NginError> {
        if child == parent {
            return Err(NginError::InvalidParent(format!(
                "{:?} cannot reference its own transform",
                child
            )));
        }
        if !self.transforms.contains_key(parent) {
            return Err(NginError::InvalidParent(format!(
                "{:?} has no transform to reference",
                parent
            )));
        }
        if !self.transforms.contains_key(child) {
            return Err(NginError::InvalidParent(format!(
                "{:?} has no transform to attach",
                child
            )));
        }

        let mut current = Some(parent);
        let mut hops = 0;
        while let Some(entity) = current {
            if entity == child {
                return Err(NginError::InvalidParent(format!(
                    "attaching {:?} to {:?} would create a cycle",
                    child, parent
                )));
            }
            hops += 1;
            if hops > self.transforms.len() {
                return Err(NginError::InvalidParent(format!(
                    "transform chain above {:?} does not terminate",
                    parent
                )));
            }
            current = self.transforms.get(entity).and_then(|t| t.parent);
        }

        if let Some(transform) = self.transforms.get_mut(child) {
            transform.parent = Some(parent);
        }
        Ok(())
    }

    pub fn detach_transform_parent(&mut self, child: Entity) {
        if let Some(transform) = self.transforms.get_mut(child) {
            transform.parent = None;
        }
    }

    /// Append `child` to `parent`'s children and link it after the previous
    /// last sibling. A child that already has another parent is unlinked
    /// from that parent's children and sibling chain first.
    ///
    /// This is the scene tree only. [`TransformComponent::reference`] is a
    /// separate chain, changed through [`Registry::attach_transform_parent`].
    pub fn add_child(&mut self, parent: Entity, child: Entity) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            log::warn!("cannot link {:?} under {:?}", child, parent);
            return;
        }
        if self.children(parent).contains(&child) {
            return;
        }
        self.unlink(child);

        let Some(parent_relation) = self.get_or_default::<RelationComponent>(parent) else {
            return;
        };
        let prev = parent_relation.children.last().copied();
        parent_relation.children.push(child);

        if let Some(child_relation) = self.get_or_default::<RelationComponent>(child) {
            child_relation.parent = Some(parent);
            child_relation.prev = prev;
            child_relation.next = None;
        }
        if let Some(prev_relation) = prev.and_then(|p| self.relations.get_mut(p)) {
            prev_relation.next = Some(child);
        }
    }

    /// Remove `child` from its current parent and close the gap between its
    /// siblings.
    fn unlink(&mut self, child: Entity) {
        let Some(relation) = self.relations.get_mut(child) else {
            return;
        };
        let old_parent = relation.parent.take();
        let (prev, next) = (relation.prev.take(), relation.next.take());

        if let Some(old) = old_parent.and_then(|p| self.relations.get_mut(p)) {
            old.children.retain(|&c| c != child);
        }
        if let Some(prev_relation) = prev.and_then(|p| self.relations.get_mut(p)) {
            prev_relation.next = next;
        }
        if let Some(next_relation) = next.and_then(|n| self.relations.get_mut(n)) {
            next_relation.prev = prev;
        }
    }

    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.relations
            .get(entity)
            .map(|relation| relation.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.tags.get(entity).map(|tag| tag.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    #[test]
    fn views_follow_creation_order() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();
        let c = registry.create();
        registry.insert(c, TagComponent::new("c"));
        registry.insert(a, TagComponent::new("a"));
        registry.insert(b, TagComponent::new("b"));

        let names: Vec<_> = registry.view::<TagComponent>().map(|(_, t)| t.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn material_is_created_on_first_touch_and_amended_after() {
        let mut registry = Registry::new();
        let e = registry.create();
        assert!(!registry.has::<MaterialComponent>(e));

        registry.get_or_default::<MaterialComponent>(e).unwrap().shininess = 8.0;
        registry.get_or_default::<MaterialComponent>(e).unwrap().is_embedded = true;

        let material = registry.get::<MaterialComponent>(e).unwrap();
        assert_eq!(material.shininess, 8.0);
        assert!(material.is_embedded);
    }

    #[test]
    fn transform_cycles_are_rejected() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();
        let c = registry.create();
        for e in [a, b, c] {
            registry.insert(e, TransformComponent::from_position(Vector3::new(1.0, 0.0, 0.0)));
        }

        registry.attach_transform_parent(b, a).unwrap();
        registry.attach_transform_parent(c, b).unwrap();

        assert!(registry.attach_transform_parent(a, c).is_err());
        assert!(registry.attach_transform_parent(a, a).is_err());
        assert_eq!(registry.get::<TransformComponent>(a).unwrap().reference(), None);
    }

    #[test]
    fn parent_needs_a_transform() {
        let mut registry = Registry::new();
        let bare = registry.create();
        let child = registry.create();
        registry.insert(child, TransformComponent::default());

        assert!(matches!(
            registry.attach_transform_parent(child, bare),
            Err(NginError::InvalidParent(_))
        ));
    }

    #[test]
    fn children_are_linked_as_siblings() {
        let mut registry = Registry::new();
        let root = registry.create();
        let first = registry.create();
        let second = registry.create();
        registry.add_child(root, first);
        registry.add_child(root, second);
        registry.add_child(root, second);

        assert_eq!(registry.children(root), &[first, second]);
        let first_rel = registry.get::<RelationComponent>(first).unwrap();
        let second_rel = registry.get::<RelationComponent>(second).unwrap();
        assert_eq!(first_rel.parent, Some(root));
        assert_eq!(first_rel.next, Some(second));
        assert_eq!(second_rel.prev, Some(first));
        assert_eq!(second_rel.next, None);
    }

    #[test]
    fn reparenting_unlinks_from_the_old_parent() {
        let mut registry = Registry::new();
        let old_parent = registry.create();
        let new_parent = registry.create();
        let first = registry.create();
        let middle = registry.create();
        let last = registry.create();
        let existing = registry.create();
        for child in [first, middle, last] {
            registry.add_child(old_parent, child);
        }
        registry.add_child(new_parent, existing);

        registry.add_child(new_parent, middle);

        assert_eq!(registry.children(old_parent), &[first, last]);
        assert_eq!(registry.children(new_parent), &[existing, middle]);
        let rel = |e| registry.get::<RelationComponent>(e).unwrap().clone();
        assert_eq!(rel(first).next, Some(last));
        assert_eq!(rel(last).prev, Some(first));
        assert_eq!(rel(middle).parent, Some(new_parent));
        assert_eq!(rel(middle).prev, Some(existing));
        assert_eq!(rel(middle).next, None);
        assert_eq!(rel(existing).next, Some(middle));
    }
}
