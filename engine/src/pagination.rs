/// Skip/take bounds for listing. `None` means no limit for that bound.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub take: Option<usize>,
    pub skip: Option<usize>,
}

impl Paging {
    pub const ALL: Paging = Paging {
        take: None,
        skip: None,
    };

    pub fn new(take: Option<usize>, skip: Option<usize>) -> Self {
        Self { take, skip }
    }

    /// Negative bounds (conventionally -1) mean "no limit".
    pub fn from_signed(take: i64, skip: i64) -> Self {
        Self {
            take: usize::try_from(take).ok(),
            skip: usize::try_from(skip).ok(),
        }
    }

    /// Skip first, then take.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.take.unwrap_or(usize::MAX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_bounds_are_unlimited() {
        assert_eq!(Paging::ALL, Paging::from_signed(-1, -1));
        assert_eq!(Paging::new(Some(2), None), Paging::from_signed(2, -1));
    }

    #[test]
    fn skip_is_applied_before_take() {
        let items = (1..=10).collect::<Vec<_>>();
        assert_eq!(vec![4, 5], Paging::new(Some(2), Some(3)).apply(items));
    }

    #[test]
    fn unlimited_returns_everything() {
        let items = (1..=10).collect::<Vec<_>>();
        assert_eq!(items.clone(), Paging::ALL.apply(items));
    }

    #[test]
    fn skip_past_end_is_empty() {
        assert!(Paging::new(None, Some(20)).apply(vec![1, 2, 3]).is_empty());
    }
}
