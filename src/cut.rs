/// An optimality cut `alpha <= slope * x + intercept`, where `x` is the
/// reservoir volume at the end of the first stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BendersCut {
    pub index: usize,
    pub slope: f64,
    pub intercept: f64,
}

impl BendersCut {
    pub fn new(index: usize, slope: f64, intercept: f64) -> Self {
        Self {
            index,
            slope,
            intercept,
        }
    }

    /// Height of the cut at a linking value
    pub fn eval_at(&self, linking_value: f64) -> f64 {
        self.slope * linking_value + self.intercept
    }

    /// Whether two cuts describe the same hyperplane, up to `tolerance`
    /// on both coefficients. The index is not compared.
    pub fn is_equivalent(&self, other: &BendersCut, tolerance: f64) -> bool {
        (self.slope - other.slope).abs() <= tolerance
            && (self.intercept - other.intercept).abs() <= tolerance
    }
}

/// Builds the supporting hyperplane of the second stage value function at
/// `linking_value`: its slope is the dual price of the linking constraint
/// and it passes through the subproblem objective at that point.
pub fn make_cut(
    index: usize,
    objective: f64,
    dual: f64,
    linking_value: f64,
) -> BendersCut {
    BendersCut::new(index, dual, objective - dual * linking_value)
}

/// Cuts in the order they were generated. Cuts are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct CutPool {
    pool: Vec<BendersCut>,
}

impl CutPool {
    pub fn new() -> Self {
        Self { pool: vec![] }
    }

    pub fn add_cut(&mut self, cut: BendersCut) {
        self.pool.push(cut);
    }

    pub fn cuts(&self) -> &[BendersCut] {
        &self.pool
    }

    pub fn last(&self) -> Option<&BendersCut> {
        self.pool.last()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Lowest cut height at a linking value, i.e. the current outer
    /// approximation of the expected second stage profit. `None` while the
    /// pool is empty.
    pub fn eval_at(&self, linking_value: f64) -> Option<f64> {
        self.pool
            .iter()
            .map(|cut| cut.eval_at(linking_value))
            .reduce(f64::min)
    }

    /// Whether some cut already in the pool matches `cut`
    pub fn contains_equivalent(&self, cut: &BendersCut, tolerance: f64) -> bool {
        self.pool.iter().any(|c| c.is_equivalent(cut, tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_is_tangent_at_generation_point() {
        let triples = [
            (1000.0, 13000.0, 0.68),
            (-25.5, -3.25, 4.0),
            (0.0, 0.0, 10.0),
            (123456.789, 27250.5, 7.123),
        ];
        for (objective, dual, x) in triples {
            let cut = make_cut(0, objective, dual, x);
            assert_eq!(cut.slope, dual);
            assert!((cut.eval_at(x) - objective).abs() <= 1e-9 * objective.abs().max(1.0));
        }
    }

    #[test]
    fn test_eval_at() {
        let cut = BendersCut::new(1, 2.0, 10.0);
        // 2.0 * 3.0 + 10.0
        assert_eq!(cut.eval_at(3.0), 16.0);
    }

    #[test]
    fn test_equivalence_ignores_index() {
        let a = BendersCut::new(1, 2.0, 10.0);
        let b = BendersCut::new(2, 2.0 + 1e-8, 10.0 - 1e-8);
        let c = BendersCut::new(3, 2.1, 10.0);
        assert!(a.is_equivalent(&b, 1e-6));
        assert!(!a.is_equivalent(&c, 1e-6));
    }

    #[test]
    fn test_new_cut_pool() {
        let pool = CutPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.eval_at(1.0), None);
        assert!(pool.last().is_none());
    }

    #[test]
    fn test_pool_keeps_insertion_order_and_takes_lowest_cut() {
        let mut pool = CutPool::new();
        pool.add_cut(BendersCut::new(1, 1.0, 0.0));
        pool.add_cut(BendersCut::new(2, -1.0, 10.0));
        let indices: Vec<usize> = pool.cuts().iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(pool.last().map(|c| c.index), Some(2));
        assert_eq!(pool.eval_at(2.0), Some(2.0));
        assert_eq!(pool.eval_at(8.0), Some(2.0));
        assert_eq!(pool.eval_at(5.0), Some(5.0));
    }

    #[test]
    fn test_contains_equivalent() {
        let mut pool = CutPool::new();
        pool.add_cut(BendersCut::new(1, 1.0, 0.0));
        pool.add_cut(BendersCut::new(2, -1.0, 10.0));
        assert!(pool.contains_equivalent(&BendersCut::new(9, 1.0, 0.0), 1e-6));
        assert!(!pool.contains_equivalent(&BendersCut::new(9, 0.5, 0.0), 1e-6));
    }
}
