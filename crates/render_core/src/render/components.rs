//! Drawable components and the renderer's draw lists
//!
//! Components are stored in generation-checked slot maps owned by the renderer. The scene
//! keeps only the returned ids, so a removed component can never be drawn again even if
//! its owner still holds the stale id.
//!
//! Meshes are drawn in registration order. Sprites are drawn in ascending draw order,
//! with equal draw orders keeping their registration order.

use slotmap::SlotMap;

use crate::foundation::math::Mat4;
use crate::resources::{MeshId, TextureId};

slotmap::new_key_type! {
    /// Id of a registered mesh component
    pub struct MeshComponentId;

    /// Id of a registered sprite component
    pub struct SpriteComponentId;
}

/// A cached mesh placed in the world
#[derive(Debug, Clone, PartialEq)]
pub struct MeshComponent {
    /// Mesh to draw
    pub mesh: MeshId,
    /// Model-to-world transform, updated by the owning scene object
    pub world_transform: Mat4,
    /// Hidden components stay registered but are skipped
    pub visible: bool,
}

impl MeshComponent {
    /// Visible component at the origin
    pub fn new(mesh: MeshId) -> Self {
        Self {
            mesh,
            world_transform: Mat4::identity(),
            visible: true,
        }
    }

    /// Set the world transform
    pub fn with_transform(mut self, world_transform: Mat4) -> Self {
        self.world_transform = world_transform;
        self
    }
}

/// A textured screen-space quad
///
/// The quad is scaled to the texture's pixel size before `world_transform` is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteComponent {
    /// Texture to draw
    pub texture: TextureId,
    /// Placement in screen pixels, centered on the screen
    pub world_transform: Mat4,
    /// Hidden components stay registered but are skipped
    pub visible: bool,
    draw_order: i32,
}

impl SpriteComponent {
    /// Visible sprite at the screen center
    pub fn new(texture: TextureId, draw_order: i32) -> Self {
        Self {
            texture,
            world_transform: Mat4::identity(),
            visible: true,
            draw_order,
        }
    }

    /// Set the world transform
    pub fn with_transform(mut self, world_transform: Mat4) -> Self {
        self.world_transform = world_transform;
        self
    }

    /// Lower values draw first
    pub const fn draw_order(&self) -> i32 {
        self.draw_order
    }
}

/// Component arenas plus the ordered lists the renderer walks each frame
#[derive(Debug, Default)]
pub struct DrawLists {
    meshes: SlotMap<MeshComponentId, MeshComponent>,
    mesh_order: Vec<MeshComponentId>,
    sprites: SlotMap<SpriteComponentId, SpriteComponent>,
    sprite_order: Vec<SpriteComponentId>,
}

impl DrawLists {
    /// Empty lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh component at the end of the mesh list
    pub fn add_mesh(&mut self, component: MeshComponent) -> MeshComponentId {
        let id = self.meshes.insert(component);
        self.mesh_order.push(id);
        id
    }

    /// Unregister a mesh component; `None` if the id is stale
    pub fn remove_mesh(&mut self, id: MeshComponentId) -> Option<MeshComponent> {
        let component = self.meshes.remove(id)?;
        self.mesh_order.retain(|&other| other != id);
        Some(component)
    }

    /// Registered mesh component
    pub fn mesh(&self, id: MeshComponentId) -> Option<&MeshComponent> {
        self.meshes.get(id)
    }

    /// Registered mesh component, for transform and visibility updates
    pub fn mesh_mut(&mut self, id: MeshComponentId) -> Option<&mut MeshComponent> {
        self.meshes.get_mut(id)
    }

    /// Mesh components in draw order
    pub fn meshes(&self) -> impl Iterator<Item = (MeshComponentId, &MeshComponent)> + '_ {
        self.mesh_order.iter().map(move |&id| (id, &self.meshes[id]))
    }

    /// Register a sprite after every sprite with a lower or equal draw order
    pub fn add_sprite(&mut self, component: SpriteComponent) -> SpriteComponentId {
        let order = component.draw_order;
        let id = self.sprites.insert(component);
        self.insert_sprite_id(id, order);
        id
    }

    /// Unregister a sprite component; `None` if the id is stale
    pub fn remove_sprite(&mut self, id: SpriteComponentId) -> Option<SpriteComponent> {
        let component = self.sprites.remove(id)?;
        self.sprite_order.retain(|&other| other != id);
        Some(component)
    }

    /// Registered sprite component
    pub fn sprite(&self, id: SpriteComponentId) -> Option<&SpriteComponent> {
        self.sprites.get(id)
    }

    /// Registered sprite component, for transform and visibility updates
    ///
    /// The draw order cannot be changed through this reference; use
    /// [`DrawLists::set_sprite_draw_order`].
    pub fn sprite_mut(&mut self, id: SpriteComponentId) -> Option<&mut SpriteComponent> {
        self.sprites.get_mut(id)
    }

    /// Move a sprite to a new draw order, behind existing sprites with the same order
    pub fn set_sprite_draw_order(&mut self, id: SpriteComponentId, draw_order: i32) -> bool {
        let Some(component) = self.sprites.get_mut(id) else {
            return false;
        };
        component.draw_order = draw_order;
        self.sprite_order.retain(|&other| other != id);
        self.insert_sprite_id(id, draw_order);
        true
    }

    /// Sprite components in draw order
    pub fn sprites(&self) -> impl Iterator<Item = (SpriteComponentId, &SpriteComponent)> + '_ {
        self.sprite_order.iter().map(move |&id| (id, &self.sprites[id]))
    }

    /// Number of registered mesh components
    pub fn mesh_count(&self) -> usize {
        self.mesh_order.len()
    }

    /// Number of registered sprite components
    pub fn sprite_count(&self) -> usize {
        self.sprite_order.len()
    }

    /// Drop every component
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.mesh_order.clear();
        self.sprites.clear();
        self.sprite_order.clear();
    }

    fn insert_sprite_id(&mut self, id: SpriteComponentId, order: i32) {
        let sprites = &self.sprites;
        let position = self
            .sprite_order
            .partition_point(|&other| sprites[other].draw_order <= order);
        self.sprite_order.insert(position, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn texture(n: u64) -> TextureId {
        TextureId::from(KeyData::from_ffi(n))
    }

    fn orders(lists: &DrawLists) -> Vec<i32> {
        lists.sprites().map(|(_, s)| s.draw_order()).collect()
    }

    #[test]
    fn test_sprites_sorted_with_stable_ties() {
        let mut lists = DrawLists::new();
        let a = lists.add_sprite(SpriteComponent::new(texture(1), 100));
        let b = lists.add_sprite(SpriteComponent::new(texture(1), 50));
        let c = lists.add_sprite(SpriteComponent::new(texture(1), 100));
        let d = lists.add_sprite(SpriteComponent::new(texture(1), 150));

        let ids: Vec<_> = lists.sprites().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b, a, c, d]);
        assert_eq!(orders(&lists), vec![50, 100, 100, 150]);
    }

    #[test]
    fn test_meshes_keep_registration_order() {
        let mut lists = DrawLists::new();
        let mesh = MeshId::from(KeyData::from_ffi(1));
        let first = lists.add_mesh(MeshComponent::new(mesh));
        let second = lists.add_mesh(MeshComponent::new(mesh));
        let third = lists.add_mesh(MeshComponent::new(mesh));

        assert!(lists.remove_mesh(second).is_some());
        let ids: Vec<_> = lists.meshes().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[test]
    fn test_removed_id_is_stale() {
        let mut lists = DrawLists::new();
        let id = lists.add_sprite(SpriteComponent::new(texture(1), 0));

        assert!(lists.remove_sprite(id).is_some());
        assert!(lists.remove_sprite(id).is_none());
        assert!(lists.sprite_mut(id).is_none());
        assert_eq!(lists.sprite_count(), 0);

        // A new component never reuses the stale id
        let replacement = lists.add_sprite(SpriteComponent::new(texture(1), 0));
        assert_ne!(replacement, id);
    }

    #[test]
    fn test_reordering_sprite() {
        let mut lists = DrawLists::new();
        let a = lists.add_sprite(SpriteComponent::new(texture(1), 10));
        let b = lists.add_sprite(SpriteComponent::new(texture(1), 20));

        assert!(lists.set_sprite_draw_order(a, 30));
        let ids: Vec<_> = lists.sprites().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(orders(&lists), vec![20, 30]);
    }
}
