use anyhow::{Context, Result};
use std::marker::PhantomData;

/// A single processing stage that turns an `I` into an `O`.
///
/// Stages compose with [`Transform::then`], so a loader, an augmentation
/// pipeline and a tensor conversion can be fused into one value:
///
/// ```ignore
/// let to_sample = pipeline.then(TargetsToSample::new().normalize(Normalize::half()));
/// let sample = to_sample.apply(Targets::new(image))?;
/// ```
///
/// `then()` requires the output of `self` to be the input of `next` and both
/// ends to be `Send`, since pipelines run inside DataLoader workers.
pub trait Transform<I, O>: Send + Sync {
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// Plain functions and closures are transforms too.
impl<I, O, F> Transform<I, O> for F
where
    F: Fn(I) -> Result<O> + Send + Sync,
{
    fn apply(&self, input: I) -> Result<O> {
        self(input)
    }
}

/// Two transforms run back to back (`A` -> `B`).
/// `M` pins the intermediate type.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Prefer [`Transform::then`]; this exists for pipelines assembled at runtime.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>(),
                    std::any::type_name::<O>()
                )
            })
    }
}
