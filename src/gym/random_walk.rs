use crate::{error::Result, mdp::FiniteMdp};

/// The classic undiscounted random walk
///
/// `n` inner states sit between two terminal ends at index `0` and `n + 1`. The single action
/// moves left or right with equal probability. Reaching the right end pays `1`, every other
/// move pays nothing. Episodes start in the middle.
///
/// The true value of inner state `i` is `i / (n + 1)`.
pub fn random_walk(n: usize) -> Result<FiniteMdp> {
    let mut mdp = FiniteMdp::new(1.0, &[n + 2], |ix| usize::from((1..=n).contains(&ix[0])));
    for i in 1..=n {
        let reward = if i == n { 1.0 } else { 0.0 };
        mdp.add_transition(&[i], 0, &[i - 1], 0.0, 0.5)?;
        mdp.add_transition(&[i], 0, &[i + 1], reward, 0.5)?;
    }
    mdp.add_start(&[(n + 1) / 2], 1.0)?;
    Ok(mdp)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::mdp::Mdp;

    #[test]
    fn random_walk_functional() {
        let mut rng = StdRng::seed_from_u64(3);
        let mdp = random_walk(5).unwrap();
        assert!(mdp.state(&[0]).unwrap().is_terminal());
        assert!(mdp.state(&[6]).unwrap().is_terminal());

        let mut s = mdp.started(&mut rng).unwrap();
        assert_eq!(s.index(), [3], "starts in the middle");

        let mut total = 0.0;
        while !s.is_terminal() {
            let outcome = s.action(0).unwrap().sample(&mdp, &mut rng).unwrap();
            total += outcome.reward;
            s = outcome.next;
        }
        let expected = if s.index() == [6] { 1.0 } else { 0.0 };
        assert_eq!(total, expected, "only the right end pays");
    }
}
