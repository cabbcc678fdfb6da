use crate::config::NodeSliderConfig;
use crate::operators::Operator;
use crate::state::State;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Slides the height of a random speciation, reticulation or origin node.
///
/// The proposal is uniform in a window around the current height and
/// reflected back into `[max child height, min parent height]`; the origin
/// is bounded above by [NodeSliderConfig::origin_upper_bound]. The move is
/// symmetric, so the log Hastings ratio is `0`.
#[derive(Debug, Clone, Default)]
pub struct NodeSlider {
    config: NodeSliderConfig,
}

impl NodeSlider {
    pub fn new(config: NodeSliderConfig) -> Self {
        Self { config }
    }
}

impl Operator for NodeSlider {
    fn name(&self) -> &str {
        "NodeSlider"
    }

    fn propose(&mut self, state: &mut State, rng: &mut dyn RngCore) -> f64 {
        let network = state.network_mut();
        let Some(&node) = network.internal_nodes_including_origin().choose(rng) else {
            return f64::NEG_INFINITY;
        };

        let upper = if network.node(node).is_origin() {
            self.config.origin_upper_bound
        } else {
            network.parents(node).map(|p| network.node(p).height()).fold(f64::INFINITY, f64::min)
        };
        let lower = network.children(node).map(|c| network.node(c).height()).fold(0.0, f64::max);

        let old_height = network.node(node).height();
        if old_height > upper {
            debug!("{}: origin at {old_height} above its bound {upper}", self.name());
            return f64::NEG_INFINITY;
        }
        let new_height = reflect(old_height + (rng.r#gen::<f64>() - 0.5) * self.config.window_size, lower, upper);
        trace!("{}: node {node} from {old_height} to {new_height}", self.name());

        network.start_editing(self.name());
        network.node_mut(node).set_height(new_height);
        network.assert_sane();
        0.0
    }
}

/// Reflects `value` at the bounds until it lies within `[lower, upper]`.
fn reflect(mut value: f64, lower: f64, upper: f64) -> f64 {
    if upper - lower <= 0.0 {
        return lower;
    }
    while value < lower || value > upper {
        if value < lower {
            value = 2.0 * lower - value;
        }
        if value > upper {
            value = 2.0 * upper - value;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_inside_bounds_is_identity() {
        assert_eq!(reflect(0.5, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_reflect_bounces_off_both_ends() {
        assert!((reflect(-0.25, 0.0, 1.0) - 0.25).abs() < 1e-12);
        assert!((reflect(1.25, 0.0, 1.0) - 0.75).abs() < 1e-12);
        assert!((reflect(2.5, 0.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reflect_unbounded_above() {
        assert_eq!(reflect(3.0, 1.0, f64::INFINITY), 3.0);
        assert!((reflect(0.5, 1.0, f64::INFINITY) - 1.5).abs() < 1e-12);
    }
}
