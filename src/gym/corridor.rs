use crate::{error::Result, mdp::FiniteMdp};

const LEFT: usize = 0;
const RIGHT: usize = 1;

/// A one-dimensional corridor with the exit on the right
///
/// States `0..length` each have two actions, left (slot 0) and right (slot 1); state `length`
/// is the terminal exit. Every move costs `-1`. With probability `slip` the agent moves the
/// opposite way from the one it chose. Moving left from state 0 stays put. Episodes start at
/// state 0.
///
/// The optimal policy always moves right, so a zero-initialized value table is optimistic.
///
/// ### Example
/// ```
/// # use tabular_rl::gym::corridor;
/// # use tabular_rl::mdp::Mdp;
/// let mdp = corridor(4, 0.0, 0.9).unwrap();
/// assert_eq!(mdp.states().len(), 5);
/// ```
pub fn corridor(length: usize, slip: f64, gamma: f64) -> Result<FiniteMdp> {
    let mut mdp = FiniteMdp::new(gamma, &[length + 1], |ix| if ix[0] < length { 2 } else { 0 });
    for i in 0..length {
        let left = i.saturating_sub(1);
        let right = i + 1;
        for (slot, intended, opposite) in [(LEFT, left, right), (RIGHT, right, left)] {
            mdp.add_transition(&[i], slot, &[intended], -1.0, 1.0 - slip)?;
            if slip > 0.0 {
                mdp.add_transition(&[i], slot, &[opposite], -1.0, slip)?;
            }
        }
    }
    mdp.add_start(&[0], 1.0)?;
    Ok(mdp)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::mdp::Mdp;

    #[test]
    fn corridor_functional() {
        let mut rng = StdRng::seed_from_u64(0);
        let mdp = corridor(3, 0.0, 1.0).unwrap();
        let mut s = mdp.started(&mut rng).unwrap();
        assert_eq!(s.index(), [0], "starts at the left end");

        let stay = s.action(LEFT).unwrap().sample(&mdp, &mut rng).unwrap();
        assert_eq!(stay.next.index(), [0], "wall on the left");
        assert_eq!(stay.reward, -1.0);

        let mut steps = 0;
        while !s.is_terminal() {
            s = s.action(RIGHT).unwrap().sample(&mdp, &mut rng).unwrap().next;
            steps += 1;
        }
        assert_eq!(steps, 3, "straight walk to the exit");
    }

    #[test]
    fn slippery_corridor_has_two_outcomes() {
        let mdp = corridor(3, 0.25, 1.0).unwrap();
        let a = mdp.state(&[1]).unwrap().action(RIGHT).unwrap();
        let outcomes = mdp.transitions(&a).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].next, [2]);
        assert_eq!(outcomes[1].next, [0]);
        assert_eq!(outcomes[1].probability, 0.25);
    }
}
