//! ECS world management and execution layer.
//!
//! This module defines [`ECSManager`], the single owner of one simulation
//! world. It is responsible for:
//!
//! * registering component types and backing each with a dense store,
//! * allocating entities and keeping every store at least as long as the
//!   entity count,
//! * checked per-entity component access,
//! * registering systems and auxiliary contexts with the scheduler,
//! * running ticks.
//!
//! ## Ownership model
//!
//! All state is owned by value and mutated through `&mut self`. Store growth
//! (entity allocation, late component registration) and tick execution both
//! need exclusive access, so a reallocation can never invalidate a slice a
//! running system holds. There is no interior mutability and no `unsafe`.
//!
//! ## Export
//!
//! [`ECSManager::column`] and [`ECSManager::export_bytes`] expose a store
//! over `[0, entity_count)` for consumers such as renderers, which upload
//! positions once per frame.

use tracing::debug;

use crate::engine::component::{ComponentDesc, ComponentRegistry};
use crate::engine::entity::{Entities, Entity};
use crate::engine::error::{AccessError, ComponentError, DependencyError, ECSResult};
use crate::engine::perf::{CounterSource, PerfStats};
use crate::engine::scheduler::{DryRunReport, ExecutionMode, Scheduler};
use crate::engine::storage::{Component, ComponentStores};
use crate::engine::systems::{AuxContext, System, SystemDescriptor};
use crate::engine::types::{AuxID, ComponentID, Signature, SystemID, Tick};


/// Owner of one simulation world.
///
/// ## Invariants
/// * `stores.len() == components.len()`; store `i` backs component id `i`.
/// * Every store holds at least `entities.len()` records.
#[derive(Default)]
pub struct ECSManager {
    components: ComponentRegistry,
    stores: ComponentStores,
    entities: Entities,
    scheduler: Scheduler,
}

impl ECSManager {
    /// Creates an empty world with sequential execution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty world with the given execution mode.
    pub fn with_mode(mode: ExecutionMode) -> Self {
        Self { scheduler: Scheduler::new(mode), ..Self::default() }
    }

    // ── Components ──────────────────────────────────────────────────────────

    /// Registers component type `T` under `name`.
    ///
    /// May be called after entities exist; the new store is immediately grown
    /// to the current entity count.
    ///
    /// ## Errors
    /// `DuplicateName` or `CapacityExhausted`.
    pub fn register_component<T: Component>(&mut self, name: &str) -> Result<ComponentID, ComponentError> {
        let id = self.components.register::<T>(name)?;
        let store_id = self.stores.push::<T>(self.entities.len());
        debug_assert_eq!(id, store_id, "ECS corruption detected: store/registry id mismatch");
        debug!(component = name, id, size = std::mem::size_of::<T>(), "registered component");
        Ok(id)
    }

    /// Component id registered under `name`.
    pub fn component_id(&self, name: &str) -> Option<ComponentID> {
        self.components.id_of(name)
    }

    /// Descriptor of a registered component.
    pub fn component_desc(&self, component_id: ComponentID) -> Option<&ComponentDesc> {
        self.components.description(component_id)
    }

    /// The component registry.
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // ── Entities ────────────────────────────────────────────────────────────

    /// Allocates an entity owning exactly the components in `signature`.
    ///
    /// Every store grows to cover the new id; the new rows hold default
    /// values until written.
    ///
    /// ## Errors
    /// `UnknownComponent` if `signature` names an unregistered id.
    pub fn allocate_entity(&mut self, signature: Signature) -> Result<Entity, ComponentError> {
        if let Some(unknown) = self.components.first_unknown(signature) {
            return Err(ComponentError::UnknownComponent(unknown));
        }
        let entity = self.entities.allocate(signature)?;
        self.stores.grow_all(self.entities.len());
        Ok(entity)
    }

    /// Number of allocated entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Signature of `entity`, if allocated.
    pub fn signature_of(&self, entity: Entity) -> Option<Signature> {
        self.entities.signature(entity)
    }

    /// The entity allocator.
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    fn check_owned(&self, component_id: ComponentID, entity: Entity) -> Result<(), AccessError> {
        let signature = self.entities.signature(entity).ok_or(AccessError::EntityOutOfRange {
            entity: entity.0,
            entity_count: self.entities.len(),
        })?;
        if self.components.description(component_id).is_none() {
            return Err(AccessError::UnknownComponent(component_id));
        }
        if !signature.has(component_id) {
            return Err(AccessError::MissingComponent {
                entity: entity.0,
                component: self.components.name_of(component_id).to_owned(),
            });
        }
        Ok(())
    }

    /// Checked read of one component record.
    ///
    /// ## Errors
    /// `EntityOutOfRange`, `UnknownComponent`, `MissingComponent`, or
    /// `TypeMismatch`.
    pub fn get_component<T: Component>(&self, component_id: ComponentID, entity: Entity) -> Result<&T, AccessError> {
        self.check_owned(component_id, entity)?;
        Ok(&self.stores.column::<T>(component_id)?[entity.index()])
    }

    /// Checked write access to one component record.
    pub fn get_component_mut<T: Component>(
        &mut self,
        component_id: ComponentID,
        entity: Entity,
    ) -> Result<&mut T, AccessError> {
        self.check_owned(component_id, entity)?;
        Ok(&mut self.stores.column_mut::<T>(component_id)?[entity.index()])
    }

    /// Typed store for `component_id` over `[0, entity_count)`.
    ///
    /// Rows of entities that do not own the component hold default values.
    pub fn column<T: Component>(&self, component_id: ComponentID) -> Result<&[T], AccessError> {
        Ok(&self.stores.column::<T>(component_id)?[..self.entities.len()])
    }

    /// Raw bytes of the store for `component_id` over `[0, entity_count)`.
    pub fn export_bytes(&self, component_id: ComponentID) -> Result<&[u8], AccessError> {
        Ok(self.stores.erased(component_id)?.as_bytes(self.entities.len()))
    }

    /// Component stores, for callers that drive systems by hand.
    pub fn stores_mut(&mut self) -> &mut ComponentStores {
        &mut self.stores
    }

    // ── Systems ─────────────────────────────────────────────────────────────

    /// Takes ownership of an auxiliary context shared by systems.
    pub fn insert_aux<T: AuxContext>(&mut self, context: T) -> AuxID {
        self.scheduler.insert_aux(context)
    }

    /// Typed access to an auxiliary context.
    pub fn aux<T: AuxContext>(&self, id: AuxID) -> Result<&T, AccessError> {
        self.scheduler.aux(id)
    }

    /// Typed mutable access to an auxiliary context.
    pub fn aux_mut<T: AuxContext>(&mut self, id: AuxID) -> Result<&mut T, AccessError> {
        self.scheduler.aux_mut(id)
    }

    /// Registers a system.
    ///
    /// ## Errors
    /// `InvalidDescriptor` if the system requires no component or names an
    /// unregistered one; otherwise as [`Scheduler::register_system`].
    pub fn register_system<S: System + 'static>(
        &mut self,
        descriptor: SystemDescriptor,
        system: S,
        aux: Option<AuxID>,
    ) -> Result<SystemID, DependencyError> {
        if descriptor.required.is_empty() {
            return Err(DependencyError::InvalidDescriptor {
                system: descriptor.name,
                reason: "system requires no components",
            });
        }
        if self.components.first_unknown(descriptor.match_signature()).is_some() {
            return Err(DependencyError::InvalidDescriptor {
                system: descriptor.name,
                reason: "system names an unregistered component",
            });
        }
        self.scheduler.register_system(descriptor, Box::new(system), aux)
    }

    /// Resolves dependencies and freezes the execution order.
    pub fn finalize(&mut self) -> Result<&[SystemID], DependencyError> {
        self.scheduler.finalize()
    }

    /// System names in execution order (empty until finalized).
    pub fn execution_order(&self) -> Vec<&str> {
        self.scheduler.order_names().collect()
    }

    /// Reports the execution order and per-system match counts.
    pub fn dry_run(&mut self) -> Result<DryRunReport, DependencyError> {
        self.scheduler.dry_run(&self.entities)
    }

    /// Advances the world by one tick.
    pub fn tick(&mut self) -> ECSResult<()> {
        self.scheduler.run_tick(&mut self.stores, &self.entities)
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> Tick {
        self.scheduler.ticks()
    }

    /// `(name, stats)` for every system, in registration order.
    pub fn system_stats(&self) -> impl Iterator<Item = (&str, &PerfStats)> {
        self.scheduler.system_stats()
    }

    /// Counters of the named system.
    pub fn stats_of(&self, name: &str) -> Option<&PerfStats> {
        self.scheduler.stats_of(name)
    }

    /// Replaces the performance counter source.
    pub fn set_counter_source(&mut self, source: Box<dyn CounterSource>) {
        self.scheduler.set_counter_source(source);
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable scheduler access (execution mode, counters).
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::systems::{FnSystem, SystemContext};

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct Health(u32);

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct Armor(f32);

    #[test]
    fn late_registration_grows_to_entity_count() {
        let mut ecs = ECSManager::new();
        let health = ecs.register_component::<Health>("health").unwrap();
        for _ in 0..5 {
            ecs.allocate_entity(Signature::of(health)).unwrap();
        }
        let armor = ecs.register_component::<Armor>("armor").unwrap();
        assert_eq!(ecs.column::<Armor>(armor).unwrap().len(), 5);
    }

    #[test]
    fn checked_access_reports_each_failure() {
        let mut ecs = ECSManager::new();
        let health = ecs.register_component::<Health>("health").unwrap();
        let armor = ecs.register_component::<Armor>("armor").unwrap();
        let e = ecs.allocate_entity(Signature::of(health)).unwrap();

        *ecs.get_component_mut::<Health>(health, e).unwrap() = Health(9);
        assert_eq!(ecs.get_component::<Health>(health, e), Ok(&Health(9)));
        assert_eq!(
            ecs.get_component::<Armor>(armor, e),
            Err(AccessError::MissingComponent { entity: 0, component: "armor".into() })
        );
        assert!(matches!(
            ecs.get_component::<Health>(health, Entity(1)),
            Err(AccessError::EntityOutOfRange { entity: 1, entity_count: 1 })
        ));
        assert!(matches!(ecs.get_component::<Armor>(health, e), Err(AccessError::TypeMismatch { .. })));
        assert!(matches!(ecs.get_component::<Armor>(7, e), Err(AccessError::UnknownComponent(7))));
    }

    #[test]
    fn allocation_rejects_unknown_components() {
        let mut ecs = ECSManager::new();
        ecs.register_component::<Health>("health").unwrap();
        assert_eq!(ecs.allocate_entity(Signature::of(3)), Err(ComponentError::UnknownComponent(3)));
        assert_eq!(ecs.entity_count(), 0);
    }

    #[test]
    fn descriptors_must_name_registered_components() {
        let mut ecs = ECSManager::new();
        let health = ecs.register_component::<Health>("health").unwrap();
        let system = || FnSystem::new(|_: &mut SystemContext<'_>, _: Entity| Ok(()));

        assert!(matches!(
            ecs.register_system(SystemDescriptor::new("none"), system(), None),
            Err(DependencyError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            ecs.register_system(SystemDescriptor::new("ghost").require(health).observe(9), system(), None),
            Err(DependencyError::InvalidDescriptor { .. })
        ));
        assert!(ecs.register_system(SystemDescriptor::new("ok").require(health), system(), None).is_ok());
    }

    #[test]
    fn tick_mutates_through_columns() {
        let mut ecs = ECSManager::new();
        let health = ecs.register_component::<Health>("health").unwrap();
        let e0 = ecs.allocate_entity(Signature::of(health)).unwrap();
        let e1 = ecs.allocate_entity(Signature::EMPTY).unwrap();

        ecs.register_system(
            SystemDescriptor::new("heal").require(health),
            FnSystem::new(move |ctx: &mut SystemContext<'_>, entity: Entity| {
                ctx.column_mut::<Health>(health)?[entity.index()].0 += 1;
                Ok(())
            }),
            None,
        )
        .unwrap();

        ecs.tick().unwrap();
        ecs.tick().unwrap();
        assert_eq!(ecs.column::<Health>(health).unwrap(), &[Health(2), Health(0)]);
        assert_eq!(ecs.signature_of(e1), Some(Signature::EMPTY));
        assert_eq!(ecs.get_component::<Health>(health, e0), Ok(&Health(2)));
        assert_eq!(ecs.export_bytes(health).unwrap().len(), 8);
        assert_eq!(ecs.ticks(), 2);
    }
}
