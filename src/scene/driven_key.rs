//! Driven-key curves: keyframes op een kanaal, aangestuurd door een ander kanaal.

use super::node::{Channel, NodeId, NodeKind};
use super::{Scene, SceneError};

/// Marge waarbinnen twee invoerwaarden als dezelfde key gelden.
const KEY_EPSILON: f64 = 1e-9;

/// Interpolatie aan één zijde van een key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tangent {
    /// Vloeiende helling op basis van beide buren.
    #[default]
    Smooth,
    /// Rechte lijn naar de naburige key.
    Linear,
}

/// Eén sample op een driven-key curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key {
    /// Waarde van het aansturende kanaal.
    pub input: f64,
    /// Waarde van het aangestuurde kanaal.
    pub value: f64,
    pub in_tangent: Tangent,
    pub out_tangent: Tangent,
}

/// Curve die `driven` laat volgen uit de actuele waarde van `driver`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrivenCurve {
    pub driver: (NodeId, Channel),
    pub driven: (NodeId, Channel),
    keys: Vec<Key>,
}

impl DrivenCurve {
    #[must_use]
    pub fn new(driver: (NodeId, Channel), driven: (NodeId, Channel)) -> Self {
        Self {
            driver,
            driven,
            keys: Vec::new(),
        }
    }

    /// Keys gesorteerd op invoerwaarde.
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Key op (ongeveer) de gegeven invoer.
    #[must_use]
    pub fn key_at(&self, input: f64) -> Option<&Key> {
        self.keys
            .iter()
            .find(|key| (key.input - input).abs() <= KEY_EPSILON)
    }

    /// Voeg een key toe; een bestaande key op dezelfde invoer wordt vervangen.
    pub fn insert_key(&mut self, input: f64, value: f64, in_tangent: Tangent) {
        let key = Key {
            input,
            value,
            in_tangent,
            out_tangent: Tangent::Smooth,
        };
        if let Some(existing) = self
            .keys
            .iter_mut()
            .find(|existing| (existing.input - input).abs() <= KEY_EPSILON)
        {
            *existing = key;
            return;
        }
        let idx = self.keys.partition_point(|existing| existing.input < input);
        self.keys.insert(idx, key);
    }

    /// Evalueer de curve. Buiten het bereik blijft de waarde van de eerste/laatste key staan.
    #[must_use]
    pub fn evaluate(&self, input: f64) -> Option<f64> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if input <= first.input {
            return Some(first.value);
        }
        if input >= last.input {
            return Some(last.value);
        }

        let upper = self.keys.partition_point(|key| key.input <= input);
        let lower = upper - 1;
        let k0 = self.keys[lower];
        let k1 = self.keys[upper];
        let span = k1.input - k0.input;
        if span <= KEY_EPSILON {
            return Some(k1.value);
        }

        let secant = (k1.value - k0.value) / span;
        let m0 = match (k0.out_tangent, lower.checked_sub(1)) {
            (Tangent::Smooth, Some(prev)) => centred_slope(&self.keys[prev], &k1),
            _ => secant,
        };
        let m1 = match (k1.in_tangent, self.keys.get(upper + 1)) {
            (Tangent::Smooth, Some(next)) => centred_slope(&k0, next),
            _ => secant,
        };

        let t = (input - k0.input) / span;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        Some(h00 * k0.value + h10 * span * m0 + h01 * k1.value + h11 * span * m1)
    }
}

impl Scene {
    /// Leg de huidige waarde van `driven` vast als key bij de huidige waarde van `driver`.
    ///
    /// De curve voor dit kanaalpaar wordt aangemaakt als hij nog niet bestaat.
    pub fn set_driven_key(
        &mut self,
        driven: (NodeId, Channel),
        driver: (NodeId, Channel),
        in_tangent: Tangent,
    ) -> Result<NodeId, SceneError> {
        let input = self.channel(driver.0, driver.1)?;
        let value = self.channel(driven.0, driven.1)?;

        let id = match self.curve_between(driver, driven) {
            Some(id) => id,
            None => {
                let driven_name = self.name(driven.0).unwrap_or_default().to_owned();
                let name = self.unique_name(&format!("{driven_name}_{}", driven.1));
                self.create_node(name, NodeKind::DrivenCurve(DrivenCurve::new(driver, driven)))?
            }
        };

        if let Some(NodeKind::DrivenCurve(curve)) = self.nodes.get_mut(&id).map(|node| &mut node.kind) {
            curve.insert_key(input, value, in_tangent);
        }
        Ok(id)
    }

    #[must_use]
    pub fn curve(&self, id: NodeId) -> Option<&DrivenCurve> {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::DrivenCurve(curve)) => Some(curve),
            _ => None,
        }
    }

    /// Curves die een kanaal van `node` aansturen.
    #[must_use]
    pub fn driven_curves(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|candidate| matches!(&candidate.kind, NodeKind::DrivenCurve(c) if c.driven.0 == node))
            .map(|candidate| candidate.id)
            .collect()
    }

    /// Curve op een bepaald kanaal van `node`.
    #[must_use]
    pub fn curve_for(&self, node: NodeId, channel: Channel) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|candidate| {
                matches!(&candidate.kind, NodeKind::DrivenCurve(c) if c.driven == (node, channel))
            })
            .map(|candidate| candidate.id)
    }

    /// Waarde die de curve op `node.channel` zou geven bij een driverwaarde `input`.
    #[must_use]
    pub fn sample_driven(&self, node: NodeId, channel: Channel, input: f64) -> Option<f64> {
        self.curve_for(node, channel)
            .and_then(|id| self.curve(id))
            .and_then(|curve| curve.evaluate(input))
    }

    /// Zet het aangestuurde kanaal op de curvewaarde en geef de wijziging terug.
    pub(super) fn apply_curve(&mut self, id: NodeId) -> Result<f64, SceneError> {
        let curve = self.curve(id).cloned().ok_or(SceneError::UnknownNode(id))?;
        let input = self.channel(curve.driver.0, curve.driver.1)?;
        let Some(value) = curve.evaluate(input) else {
            return Ok(0.0);
        };
        let previous = self.channel(curve.driven.0, curve.driven.1)?;
        self.set_channel(curve.driven.0, curve.driven.1, value)?;
        Ok((previous - value).abs())
    }

    fn curve_between(&self, driver: (NodeId, Channel), driven: (NodeId, Channel)) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|candidate| {
                matches!(&candidate.kind, NodeKind::DrivenCurve(c) if c.driver == driver && c.driven == driven)
            })
            .map(|candidate| candidate.id)
    }
}

fn centred_slope(before: &Key, after: &Key) -> f64 {
    let span = after.input - before.input;
    if span.abs() <= KEY_EPSILON {
        0.0
    } else {
        (after.value - before.value) / span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Axis;

    fn curve() -> DrivenCurve {
        DrivenCurve::new(
            (NodeId::new(1), Channel::Translate(Axis::X)),
            (NodeId::new(2), Channel::Scale(Axis::X)),
        )
    }

    #[test]
    fn keys_stay_sorted_and_replace_duplicates() {
        let mut c = curve();
        c.insert_key(10.0, 1.0, Tangent::Smooth);
        c.insert_key(15.0, 1.5, Tangent::Smooth);
        c.insert_key(5.0, 0.5, Tangent::Linear);
        c.insert_key(10.0, 2.0, Tangent::Smooth);

        let inputs: Vec<f64> = c.keys().iter().map(|k| k.input).collect();
        assert_eq!(inputs, vec![5.0, 10.0, 15.0]);
        assert_eq!(c.key_at(10.0).map(|k| k.value), Some(2.0));
        assert_eq!(c.key_at(5.0).map(|k| k.in_tangent), Some(Tangent::Linear));
    }

    #[test]
    fn hits_keys_and_clamps_outside() {
        let mut c = curve();
        c.insert_key(5.0, 1.414, Tangent::Linear);
        c.insert_key(10.0, 1.0, Tangent::Smooth);
        c.insert_key(15.0, 0.8165, Tangent::Smooth);

        for key in c.keys() {
            let value = c.evaluate(key.input).expect("curve heeft keys");
            assert!((value - key.value).abs() < 1e-12);
        }
        assert_eq!(c.evaluate(0.0), Some(1.414));
        assert_eq!(c.evaluate(100.0), Some(0.8165));
    }

    #[test]
    fn collinear_keys_interpolate_linearly() {
        let mut c = curve();
        c.insert_key(5.0, 0.5, Tangent::Linear);
        c.insert_key(10.0, 1.0, Tangent::Smooth);
        c.insert_key(15.0, 1.5, Tangent::Smooth);

        let value = c.evaluate(7.5).expect("curve heeft keys");
        assert!((value - 0.75).abs() < 1e-12);
        let value = c.evaluate(12.5).expect("curve heeft keys");
        assert!((value - 1.25).abs() < 1e-12);
    }

    #[test]
    fn empty_curve_has_no_value() {
        assert!(curve().evaluate(1.0).is_none());
    }

    #[test]
    fn scene_records_keys_from_live_channels() {
        let mut scene = Scene::new();
        let tip = scene.create_node("tip", NodeKind::joint(1.0)).unwrap();
        let out = scene.create_node("out", NodeKind::joint(1.0)).unwrap();
        let driver = (tip, Channel::Translate(Axis::X));
        let driven = (out, Channel::Scale(Axis::X));

        scene.set_channel(tip, driver.1, 10.0).unwrap();
        let id = scene.set_driven_key(driven, driver, Tangent::Smooth).unwrap();
        scene.set_channel(tip, driver.1, 20.0).unwrap();
        scene.set_channel(out, driven.1, 2.0).unwrap();
        let same = scene.set_driven_key(driven, driver, Tangent::Linear).unwrap();

        assert_eq!(id, same);
        assert_eq!(scene.name(id), Some("out_scaleX"));
        assert_eq!(scene.driven_curves(out), vec![id]);
        assert_eq!(scene.curve(id).map(|c| c.keys().len()), Some(2));
        let sampled = scene.sample_driven(out, driven.1, 15.0).expect("curve bestaat");
        assert!((sampled - 1.5).abs() < 1e-12);

        scene.set_channel(tip, driver.1, 10.0).unwrap();
        let delta = scene.apply_curve(id).unwrap();
        assert!((delta - 1.0).abs() < 1e-12);
        assert!((scene.channel(out, driven.1).unwrap() - 1.0).abs() < 1e-12);
    }
}
