use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Index};

/// A range of ages in whole years. Both ends are inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    min: i32,
    max: Option<i32>,
}

impl AgeBand {
    /// # Panics
    ///
    /// Panics if `max < min`.
    pub const fn new(min: i32, max: i32) -> Self {
        if max < min {
            panic!("age bands must go from low to high")
        }
        AgeBand {
            min,
            max: Some(max),
        }
    }

    /// `min` and anything older.
    pub const fn at_least(min: i32) -> Self {
        AgeBand { min, max: None }
    }

    pub fn contains(&self, age: i32) -> bool {
        match self.max {
            Some(max) => self.min <= age && age <= max,
            None => self.min <= age,
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} - {}", self.min, max),
            None => write!(f, "{}+", self.min),
        }
    }
}

/// A list of age bands for tallying ages into.
///
/// Bands may overlap or leave gaps. An age is counted once against every band that contains it,
/// and ages not covered by any band are counted as `outside`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeBands {
    bands: Vec<AgeBand>,
}

impl AgeBands {
    pub fn new(bands: Vec<AgeBand>) -> Self {
        Self { bands }
    }

    pub fn bucket(&self, ages: impl IntoIterator<Item = i32>) -> AgeBandCounts {
        let mut counts = vec![0usize; self.bands.len()];
        let mut outside = 0;
        for age in ages {
            let mut found = false;
            for (idx, band) in self.bands.iter().enumerate() {
                if band.contains(age) {
                    counts[idx] += 1;
                    found = true;
                }
            }
            if !found {
                outside += 1;
            }
        }
        AgeBandCounts {
            bands: self.bands.clone(),
            counts,
            outside,
        }
    }
}

/// Output of `AgeBands::bucket`.
#[derive(Debug, Clone)]
pub struct AgeBandCounts {
    bands: Vec<AgeBand>,
    counts: Vec<usize>,
    outside: usize,
}

impl AgeBandCounts {
    pub fn iter(&self) -> impl Iterator<Item = (AgeBand, usize)> + '_ {
        self.bands.iter().copied().zip(self.counts.iter().copied())
    }

    /// Number of ages that didn't fall in any band.
    pub fn outside(&self) -> usize {
        self.outside
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.outside
    }
}

impl Index<usize> for AgeBandCounts {
    type Output = usize;
    fn index(&self, idx: usize) -> &usize {
        &self.counts[idx]
    }
}

impl fmt::Display for AgeBandCounts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter()
                .map(|(band, count)| format!("{}: {}", band, count))
                .join(", ")
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inclusive_ends() {
        let band = AgeBand::new(10, 17);
        assert!(!band.contains(9));
        assert!(band.contains(10));
        assert!(band.contains(17));
        assert!(!band.contains(18));
        assert_eq!(band.to_string(), "10 - 17");
        assert_eq!(AgeBand::at_least(18).to_string(), "18+");
    }

    #[test]
    fn bucket_counts_gaps() {
        let bands = AgeBands::new(vec![AgeBand::new(0, 9), AgeBand::new(10, 17)]);
        let counts = bands.bucket([3, 10, 12, 17, 40]);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[1], 3);
        assert_eq!(counts.outside(), 1);
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.to_string(), "0 - 9: 1, 10 - 17: 3");
    }

    #[test]
    #[should_panic]
    fn backwards_band() {
        AgeBand::new(17, 10);
    }
}
