use async_trait::async_trait;

use crate::DistillError;

#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: Send + 'static> {
    async fn invoke(&self, input: Input) -> Result<Output, DistillError>;
}

#[async_trait]
impl<Input, Output, R> Runnable<Input, Output> for std::sync::Arc<R>
where
    Input: Send + 'static,
    Output: Send + 'static,
    R: Runnable<Input, Output> + Send + Sync + ?Sized,
{
    async fn invoke(&self, input: Input) -> Result<Output, DistillError> {
        (**self).invoke(input).await
    }
}
