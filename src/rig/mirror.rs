//! Spiegelen van een rig naar de andere lichaamszijde.

use crate::geom::Axis;
use crate::scene::node::NodeId;
use crate::scene::Scene;

use super::{MuscleRig, RigError, RigResult};

/// Naam van de gespiegelde rig: elke `Left` wordt `Right`, of anders elke `Right` wordt `Left`.
pub fn mirrored_name(name: &str) -> RigResult<String> {
    if name.contains("Left") {
        Ok(name.replace("Left", "Right"))
    } else if name.contains("Right") {
        Ok(name.replace("Right", "Left"))
    } else {
        Err(RigError::MissingSideMarker(name.to_owned()))
    }
}

impl MuscleRig {
    /// Bouw een gespiegelde kopie tussen twee nieuwe anchors.
    ///
    /// De wereldposities van origin, insertion en driver worden over `axis` gespiegeld en via de
    /// sessie-locators van de nieuwe rig ingesteld. De nieuwe rig is na afloop gecommit; de bron
    /// blijft ongewijzigd.
    pub fn mirror(
        &self,
        scene: &mut Scene,
        origin_anchor: NodeId,
        insertion_anchor: NodeId,
        axis: Axis,
    ) -> RigResult<Self> {
        let name = mirrored_name(&self.name)?;
        self.ensure_nodes(scene)?;
        scene.evaluate()?;

        let origin = scene.world_position(self.nodes.origin)?.mirrored(axis);
        let insertion = scene.world_position(self.nodes.insertion)?.mirrored(axis);
        let center = scene.world_position(self.nodes.driver)?.mirrored(axis);
        log::debug!("spiegel `{}` naar `{name}` over de {axis}-as", self.name);

        let mut rig = Self::create_from_attach_objects(
            scene,
            &name,
            origin_anchor,
            insertion_anchor,
            self.params,
        )?;
        let session = rig.session().copied().ok_or_else(|| RigError::NotEditing {
            rig: name.clone(),
        })?;

        scene.set_world_position(session.origin_loc, origin)?;
        scene.set_world_position(session.insertion_loc, insertion)?;
        scene.evaluate()?;
        scene.set_world_position(session.center_loc, center)?;

        for (child, parent) in [
            (rig.nodes.origin, origin_anchor),
            (session.origin_loc, origin_anchor),
            (rig.nodes.insertion, insertion_anchor),
            (session.insertion_loc, insertion_anchor),
        ] {
            if scene.parent(child) != Some(parent) {
                scene.reparent(child, Some(parent))?;
            }
        }

        rig.update(scene)?;
        log::info!("rig `{}` gespiegeld naar `{name}`", self.name);
        Ok(rig)
    }
}
