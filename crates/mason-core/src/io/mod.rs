//! IO modules - side effects (network, archives)

pub mod extract;
pub mod fetch;
