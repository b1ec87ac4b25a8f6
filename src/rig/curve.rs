//! Deformatiecurves: schaal en translatie van het output-gewricht als functie van de spierlengte.
//!
//! Drie poses per as, in vaste volgorde: rust, stretch en compressie. De driver is de
//! X-translatie van `tip`, die gelijk is aan de actuele spierlengte.

use crate::geom::Axis;
use crate::scene::node::NodeId;
use crate::scene::{Channel, Scene, Tangent};

use super::{MuscleRig, RigResult};

/// Lengte-as van de spier.
pub const PRIMARY_AXIS: Axis = Axis::X;

/// Kanaal van `tip` dat de curves aanstuurt.
pub const DRIVER_CHANNEL: Channel = Channel::Translate(PRIMARY_AXIS);

/// Schaal op de dwarse assen die het volume behoudt: `sqrt(1/factor)`.
#[must_use]
pub fn volume_preserving_scale(factor: f64) -> f64 {
    (1.0 / factor).sqrt()
}

/// Schrijf de driven keys op het output-gewricht en geef de rustlengte terug.
///
/// `tip` en het output-gewricht staan na afloop weer in de rustpose.
pub fn author(scene: &mut Scene, rig: &MuscleRig) -> RigResult<f64> {
    let nodes = rig.nodes();
    let params = rig.params();
    let tip = nodes.tip;
    let output = nodes.output_joint;
    let rest_length = scene.channel(tip, DRIVER_CHANNEL)?;
    let driver = (tip, DRIVER_CHANNEL);

    let poses = [
        (params.stretch_factor, params.stretch_offset, Tangent::Smooth),
        (params.compression_factor, params.compression_offset, Tangent::Linear),
    ];

    for axis in Axis::ALL {
        let scale = Channel::Scale(axis);
        let translate = Channel::Translate(axis);

        set_rest(scene, output, axis)?;
        scene.set_driven_key((output, scale), driver, Tangent::Smooth)?;
        scene.set_driven_key((output, translate), driver, Tangent::Smooth)?;

        for (factor, offset, in_tangent) in poses {
            scene.set_channel(tip, DRIVER_CHANNEL, rest_length * factor)?;
            if axis == PRIMARY_AXIS {
                scene.set_channel(output, scale, factor)?;
            } else {
                scene.set_channel(output, scale, volume_preserving_scale(factor))?;
                scene.set_channel(output, translate, offset.get(axis))?;
            }
            scene.set_driven_key((output, scale), driver, in_tangent)?;
            scene.set_driven_key((output, translate), driver, in_tangent)?;
        }

        scene.set_channel(tip, DRIVER_CHANNEL, rest_length)?;
    }

    for axis in Axis::ALL {
        set_rest(scene, output, axis)?;
    }

    log::debug!(
        "deformatiecurves geschreven voor `{}` (rustlengte {rest_length})",
        rig.name()
    );
    Ok(rest_length)
}

/// Verwijder alle driven curves op het output-gewricht. Geeft het aantal verwijderde curves terug.
pub fn purge_curves(scene: &mut Scene, output_joint: NodeId) -> RigResult<usize> {
    let curves = scene.driven_curves(output_joint);
    let count = curves.len();
    for curve in curves {
        if scene.exists(curve) {
            scene.delete(curve)?;
        }
    }
    Ok(count)
}

fn set_rest(scene: &mut Scene, output: NodeId, axis: Axis) -> RigResult<()> {
    scene.set_channel(output, Channel::Scale(axis), 1.0)?;
    scene.set_channel(output, Channel::Translate(axis), 0.0)?;
    Ok(())
}
