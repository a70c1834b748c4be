use super::Dispatcher;
use std::ops::ControlFlow;
use volley_core::ConstantRate;

/// One token per `1 / rate`, until cancelled or the token budget is used up.
pub(super) async fn run(dispatcher: &mut Dispatcher, config: ConstantRate) -> ControlFlow<()> {
    dispatcher.emit(config.rate, None, config.max_tokens).await
}
