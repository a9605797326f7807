pub mod message;
pub mod metrics;
pub mod notifier;
pub mod orders;
pub mod telegram;

pub use message::{format_order_message, resolve_placed_at};
pub use self::metrics::{get_metrics, init_metrics, record_order_notification};
pub use notifier::{
    ChatCredentials, ChatNotifier, MockChatNotifier, NotifierError, NotifierResponse, ReplyBody,
};
pub use orders::OrderHandler;
pub use telegram::TelegramNotifier;
