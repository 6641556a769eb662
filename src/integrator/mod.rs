// integrator/mod.rs
// Boris leapfrog pushers: relativistic (exact engine) and γ ≡ 1 (interactive engine)

mod boris;

pub use boris::*;
