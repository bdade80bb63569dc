//! Random matrix distribution objects (family `MATR`), e.g. a random
//! correlation matrix. Only the shape is part of this core; the methods
//! that sample such objects (outside this core's scope) own the rest.

use crate::error::{Error, ErrorKind};

#[derive(Clone, Copy)]
pub struct MatrDistr {
    rows: usize,
    cols: usize,
}

impl MatrDistr {
    pub fn new(rows: usize, cols: usize) -> Result<Self, Error> {
        if rows == 0 || cols == 0 {
            return Err(Error::new(ErrorKind::DistrSet, "matrix distribution must have positive shape"));
        }
        Ok(MatrDistr { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_shape() {
        assert!(MatrDistr::new(0, 3).is_err());
    }
}
