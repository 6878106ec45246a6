use itertools::iproduct;

use crate::error::{GraphCutError, Result};
use crate::graph::Terminal;

/// A scalar volume stored row-major, x varying fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    dimensions: [usize; 3],
    intensities: Vec<f64>,
}

impl Volume {
    pub fn new(dimensions: [usize; 3], intensities: Vec<f64>) -> Result<Self> {
        if dimensions.iter().any(|&d| d == 0) {
            return Err(GraphCutError::InvalidDimensions(dimensions.map(|d| d as i64)));
        }
        let expected = dimensions.iter().product();
        if intensities.len() != expected {
            return Err(GraphCutError::VolumeSizeMismatch {
                dimensions,
                expected,
                actual: intensities.len(),
            });
        }
        Ok(Self {
            dimensions,
            intensities,
        })
    }

    /// Builds a volume by evaluating `intensity` at every `[x, y, z]`.
    pub fn from_fn<F>(dimensions: [usize; 3], mut intensity: F) -> Result<Self>
    where
        F: FnMut([usize; 3]) -> f64,
    {
        let [width, height, depth] = dimensions;
        let intensities = iproduct!(0..depth, 0..height, 0..width)
            .map(|(z, y, x)| intensity([x, y, z]))
            .collect();
        Self::new(dimensions, intensities)
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn intensity(&self, index: usize) -> f64 {
        self.intensities[index]
    }

    pub fn intensity_at(&self, coordinate: [usize; 3]) -> f64 {
        let [x, y, z] = coordinate;
        let [width, height, _] = self.dimensions;
        self.intensities[x + y * width + z * width * height]
    }
}

/// Segmentation result for one voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Label {
    Foreground,
    Background,
    /// Reached by neither tree.
    #[default]
    Unlabelled,
}

impl Label {
    /// Numeric encoding used in exported label volumes.
    pub fn value(self) -> i8 {
        match self {
            Label::Foreground => 1,
            Label::Background => -1,
            Label::Unlabelled => 0,
        }
    }
}

impl From<Option<Terminal>> for Label {
    fn from(tree: Option<Terminal>) -> Self {
        match tree {
            Some(Terminal::Source) => Label::Foreground,
            Some(Terminal::Sink) => Label::Background,
            None => Label::Unlabelled,
        }
    }
}

/// Per-voxel labels with the dimensions of the segmented volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelVolume {
    dimensions: [usize; 3],
    labels: Vec<Label>,
}

impl LabelVolume {
    pub fn new(dimensions: [usize; 3], labels: Vec<Label>) -> Self {
        assert_eq!(
            dimensions.iter().product::<usize>(),
            labels.len(),
            "label count does not match dimensions {dimensions:?}"
        );
        Self { dimensions, labels }
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Label {
        self.labels[index]
    }

    pub fn label_at(&self, coordinate: [usize; 3]) -> Label {
        let [x, y, z] = coordinate;
        let [width, height, _] = self.dimensions;
        self.labels[x + y * width + z * width * height]
    }

    pub fn values(&self) -> Vec<i8> {
        self.labels.iter().map(|label| label.value()).collect()
    }

    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }
}
