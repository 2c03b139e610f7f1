/// Optional upper bound of confirmed enrollments for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity(Option<i64>);

impl From<Option<i32>> for Capacity {
    fn from(value: Option<i32>) -> Self {
        Self(value.filter(|max| *max > 0).map(i64::from))
    }
}

impl Capacity {
    /// A new payment may be submitted while confirmed purchases plus payments
    /// still under review stay below the limit.
    pub fn admits_submission(&self, confirmed: i64, pending: i64) -> bool {
        self.0.is_none_or(|max| confirmed + pending < max)
    }

    /// A payment may be approved while confirmed purchases stay below the limit.
    pub fn admits_approval(&self, confirmed: i64) -> bool {
        self.0.is_none_or(|max| confirmed < max)
    }
}
