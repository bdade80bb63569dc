//! L1 support layer: floating-point predicates, linear algebra, adaptive
//! quadrature, and the debug log sink. Nothing here depends on the
//! distribution, method, or generator layers above it.

pub mod float;
pub mod linalg;
pub mod log;
pub mod quadrature;
