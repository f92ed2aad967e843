/// The pipeline stage a worker is currently in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Starting,
    Planning,
    Segmenting,
    Stitching,
    Scheming,
    Mapping,
    Writing,
    Verifying,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Starting => "Starting",
            Self::Planning => "Planning scan",
            Self::Segmenting => "Segmenting",
            Self::Stitching => "Stitching global mask",
            Self::Scheming => "Generating bit scheme",
            Self::Mapping => "Rendering cleave maps",
            Self::Writing => "Writing tables",
            Self::Verifying => "Verifying",
            Self::Done => "Done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageStatus {
    /// Fraction of the whole pipeline completed, 0 to 1
    pub progress: f32,
    pub stage: Stage,
}

impl StageStatus {
    pub fn new(progress: f32, stage: Stage) -> Self {
        Self { progress, stage }
    }
}
