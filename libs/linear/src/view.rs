/// Read-only access to a linear range of `T`.
///
/// The owning containers and plain slices all implement this, so functions
/// that only read take `impl View<T>` and accept any of them. A mutable
/// view can never be obtained from a read-only source; that direction is
/// simply absent from the trait surface.
pub trait View<T> {
    fn view(&self) -> &[T];
}

/// Mutable access to a linear range of `T`. Implies [`View`].
pub trait ViewMut<T>: View<T> {
    fn view_mut(&mut self) -> &mut [T];
}

impl<T, C: AsRef<[T]> + ?Sized> View<T> for C {
    fn view(&self) -> &[T] {
        self.as_ref()
    }
}

impl<T, C: AsRef<[T]> + AsMut<[T]> + ?Sized> ViewMut<T> for C {
    fn view_mut(&mut self) -> &mut [T] {
        self.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, List};

    fn sum(values: &impl View<u32>) -> u32 {
        values.view().iter().sum()
    }

    #[test]
    fn owning_containers_are_views() {
        let list: List<u32> = [1, 2, 3].into();
        let array = Array::new([4_u32, 5]);
        assert_eq!(sum(&list), 6);
        assert_eq!(sum(&array), 9);
        assert_eq!(sum(&[10_u32, 20].as_slice()), 30);
    }

    #[test]
    fn mutable_views_reach_the_same_buffer() {
        let mut list: List<u32> = [1, 2, 3].into();
        list.view_mut()[0] = 9;
        assert_eq!(list, [9, 2, 3]);
    }
}
