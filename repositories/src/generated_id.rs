use uuid::Uuid;

/// Ids a repository can hand out itself when an entity arrives without one.
pub trait GeneratedId: Sized {
    /// Whether this value means "no id yet".
    fn is_unassigned(&self) -> bool;

    /// The id to assign after `last`, the greatest id currently in use.
    /// `None` when the id space is exhausted.
    fn next_after(last: Option<&Self>) -> Option<Self>;
}

macro_rules! sequential_id {
    ($($ty:ty),*) => {
        $(
            impl GeneratedId for $ty {
                fn is_unassigned(&self) -> bool {
                    *self == 0
                }

                fn next_after(last: Option<&Self>) -> Option<Self> {
                    match last {
                        Some(&last) if last > 0 => last.checked_add(1),
                        _ => Some(1),
                    }
                }
            }
        )*
    };
}

sequential_id!(i32, i64, u32);

impl GeneratedId for String {
    fn is_unassigned(&self) -> bool {
        self.is_empty()
    }

    fn next_after(_: Option<&Self>) -> Option<Self> {
        Some(Uuid::now_v7().to_string())
    }
}

impl GeneratedId for Uuid {
    fn is_unassigned(&self) -> bool {
        self.is_nil()
    }

    fn next_after(_: Option<&Self>) -> Option<Self> {
        Some(Uuid::now_v7())
    }
}
