use crate::dataloader::{with_worker_rng, worker_gen_bool};
use crate::transforms::vision::targets::Targets;
use crate::transforms::Transform;
use anyhow::{bail, ensure, Context, Result};
use image::RgbImage;
use rand::distr::{weighted::WeightedIndex, Distribution};
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::trace;

/// Validates an application probability.
pub(crate) fn check_probability(p: f64) -> Result<f64> {
    ensure!(
        (0.0..=1.0).contains(&p),
        "Probability must be in [0.0, 1.0] range (got {})",
        p
    );
    Ok(p)
}

/// One randomized step of an augmentation pipeline.
///
/// `maybe_apply` rolls against [`probability`](Augmentation::probability) using the
/// worker RNG. When the step fires, `apply_always` samples the step's random
/// parameters once and applies them to every member of the [`Targets`].
pub trait Augmentation: Debug + Send + Sync {
    /// Short name used in error context.
    fn name(&self) -> &'static str;

    /// Probability that the step runs on a given call.
    fn probability(&self) -> f64;

    /// Runs the step unconditionally.
    fn apply_always(&self, targets: Targets) -> Result<Targets>;

    fn maybe_apply(&self, targets: Targets) -> Result<Targets> {
        let p = self.probability();
        let fire = if p >= 1.0 {
            true
        } else if p <= 0.0 {
            false
        } else {
            worker_gen_bool(p)
        };

        if fire {
            self.apply_always(targets)
        } else {
            Ok(targets)
        }
    }
}

// ============================================================================
// Compose
// ============================================================================

/// An ordered augmentation pipeline.
///
/// Steps run in insertion order, each on the output of the previous one.
/// When run through [`Transform::apply`] or [`apply_image`](Compose::apply_image),
/// the pipeline first checks that every target name it receives was
/// declared, and (unless disabled with `check_shapes(false)`) that every
/// mask and additional image has the same size as the primary image.
/// A `Compose` nested as a step skips these checks and inherits the
/// outer pipeline's targets and shape policy.
///
/// # Example
/// ```ignore
/// let transform = Compose::new()
///     .with_step(Resize::new(1920, 1080)?)
///     .with_step(RandomCrop::new(1280, 720)?)
///     .with_step(Rotate::new(40.0, 0.9)?.border_mode(BorderMode::Constant(0)))
///     .with_step(HorizontalFlip::new(0.5)?)
///     .with_step(VerticalFlip::new(0.1)?)
///     .with_step(RgbShift::new(25, 25, 25, 0.9)?)
///     .with_step(OneOf::new(vec![Box::new(Blur::new(3, 0.5)?), Box::new(ColorJitter::new(0.5)?)], 1.0)?);
///
/// let augmented = transform.apply(Targets::new(image).with_masks(vec![mask, mask2]))?;
/// ```
#[derive(Debug)]
pub struct Compose {
    steps: Vec<Box<dyn Augmentation>>,
    additional_targets: BTreeSet<String>,
    check_shapes: bool,
    p: f64,
}

impl Compose {
    /// An empty pipeline with shape checking enabled.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            additional_targets: BTreeSet::new(),
            check_shapes: true,
            p: 1.0,
        }
    }

    /// Builds a pipeline from already boxed steps.
    pub fn from_steps(steps: Vec<Box<dyn Augmentation>>) -> Self {
        Self {
            steps,
            ..Self::new()
        }
    }

    /// Appends a step.
    pub fn with_step(mut self, step: impl Augmentation + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Declares an additional image target (e.g. `"image0"`).
    pub fn with_additional_target(mut self, name: impl Into<String>) -> Self {
        self.additional_targets.insert(name.into());
        self
    }

    /// Enables or disables the image/mask size check.
    pub fn check_shapes(mut self, enabled: bool) -> Self {
        self.check_shapes = enabled;
        self
    }

    /// Probability that the whole pipeline runs when nested inside another one.
    pub fn with_probability(mut self, p: f64) -> Result<Self> {
        self.p = check_probability(p)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    fn validate(&self, targets: &Targets) -> Result<()> {
        for name in targets.image_names() {
            ensure!(
                self.additional_targets.contains(name),
                "Image target '{}' was not declared as an additional target (declared: {:?})",
                name,
                self.additional_targets
            );
        }

        if self.check_shapes {
            let mismatches = targets.shape_mismatches();
            if !mismatches.is_empty() {
                let (w, h) = targets.dimensions();
                bail!(
                    "Target shapes must match the image ({}x{}), got: {}",
                    w,
                    h,
                    mismatches
                        .iter()
                        .map(|(label, w, h)| format!("{} is {}x{}", label, w, h))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        Ok(())
    }

    /// Runs the pipeline on a bare image.
    pub fn apply_image(&self, image: RgbImage) -> Result<RgbImage> {
        Ok(Transform::apply(self, Targets::new(image))?.into_image())
    }
}

impl Default for Compose {
    fn default() -> Self {
        Self::new()
    }
}

impl Augmentation for Compose {
    fn name(&self) -> &'static str {
        "Compose"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        self.steps
            .iter()
            .enumerate()
            .try_fold(targets, |targets, (i, step)| {
                trace!(step = step.name(), index = i, "applying augmentation");
                step.maybe_apply(targets)
                    .with_context(|| format!("Augmentation step {} ({}) failed", i, step.name()))
            })
    }
}

impl Transform<Targets, Targets> for Compose {
    fn apply(&self, targets: Targets) -> Result<Targets> {
        self.validate(&targets)?;
        self.maybe_apply(targets)
    }
}

// ============================================================================
// OneOf
// ============================================================================

/// Applies exactly one of its children.
///
/// With probability `p` the group fires; the child is then picked at random
/// with weights proportional to the children's own probabilities and applied
/// unconditionally.
#[derive(Debug)]
pub struct OneOf {
    children: Vec<Box<dyn Augmentation>>,
    weights: WeightedIndex<f64>,
    p: f64,
}

impl OneOf {
    pub fn new(children: Vec<Box<dyn Augmentation>>, p: f64) -> Result<Self> {
        ensure!(!children.is_empty(), "OneOf requires at least one child");
        let weights = WeightedIndex::new(children.iter().map(|c| c.probability()))
            .context("OneOf children need at least one non-zero probability")?;
        Ok(Self {
            children,
            weights,
            p: check_probability(p)?,
        })
    }
}

impl Augmentation for OneOf {
    fn name(&self) -> &'static str {
        "OneOf"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let choice = with_worker_rng(|rng| self.weights.sample(rng));
        let child = &self.children[choice];
        trace!(choice = child.name(), "OneOf picked");
        child.apply_always(targets)
    }
}
