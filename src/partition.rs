//! Baseline partition: how many groups, and how large each one is.

pub const MIN_GROUP_SIZE: usize = 2;
pub const MAX_GROUP_SIZE: usize = 10;

/// Clamps a caller-supplied group size into the supported range.
pub fn clamp_group_size(preferred: usize) -> usize {
    preferred.clamp(MIN_GROUP_SIZE, MAX_GROUP_SIZE)
}

/// `ceil(n / size)`, and at least one group whenever there is a student.
pub fn group_count(student_count: usize, group_size: usize) -> usize {
    if student_count == 0 {
        return 0;
    }
    student_count.div_ceil(group_size.max(1)).max(1)
}

/// Capacities of `group_count` buckets holding `student_count` students.
///
/// The first `student_count % group_count` buckets take one extra student, so
/// sizes never differ by more than one.
pub fn capacities(student_count: usize, group_count: usize) -> Vec<usize> {
    if group_count == 0 {
        return Vec::new();
    }
    let base = student_count / group_count;
    let extra = student_count % group_count;
    (0..group_count)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Bucket capacities for a roster, clamping the preferred size first.
pub fn plan(student_count: usize, preferred_group_size: usize) -> Vec<usize> {
    let size = clamp_group_size(preferred_group_size);
    capacities(student_count, group_count(student_count, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_group_size() {
        assert_eq!(clamp_group_size(0), 2);
        assert_eq!(clamp_group_size(1), 2);
        assert_eq!(clamp_group_size(4), 4);
        assert_eq!(clamp_group_size(42), 10);
    }

    #[test]
    fn test_group_count() {
        assert_eq!(group_count(0, 4), 0);
        assert_eq!(group_count(3, 4), 1);
        assert_eq!(group_count(8, 4), 2);
        assert_eq!(group_count(9, 4), 3);
        // unclamped zero size must not divide by zero
        assert_eq!(group_count(5, 0), 5);
    }

    #[test]
    fn test_capacities_differ_by_at_most_one() {
        for n in 0..=60 {
            for size in MIN_GROUP_SIZE..=MAX_GROUP_SIZE {
                let caps = plan(n, size);
                assert_eq!(caps.iter().sum::<usize>(), n, "n={} size={}", n, size);
                if let (Some(max), Some(min)) = (caps.iter().max(), caps.iter().min()) {
                    assert!(max - min <= 1, "n={} size={} caps={:?}", n, size, caps);
                    assert!(*max <= size, "n={} size={} caps={:?}", n, size, caps);
                }
            }
        }
    }

    #[test]
    fn test_small_roster_is_single_group() {
        assert_eq!(plan(3, 5), vec![3]);
        assert_eq!(plan(1, 4), vec![1]);
    }

    #[test]
    fn test_nine_into_fours() {
        // three groups of three rather than 4 + 4 + 1
        assert_eq!(plan(9, 4), vec![3, 3, 3]);
        assert_eq!(plan(10, 4), vec![4, 3, 3]);
    }
}
