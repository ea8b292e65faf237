//! Контракты внешних коллабораторов конвейера ингестии.
//!
//! Крейт определяет только трейты и типы данных, без зависимости от
//! async-рантайма: реализации (MQTT, InfluxDB, тестовые двойники) живут
//! в своих крейтах.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

mod error;
mod point;
mod util;

pub use error::{ClientError, ErrorKind};
pub use point::{DataPoint, FieldValue};
pub use util::{now_ms, now_ns};

// ════════════════════════════════════════════════════════════════
//  Transport (pub/sub)
// ════════════════════════════════════════════════════════════════

/// Callback доставки: транспорт вызывает его на каждое входящее сообщение.
///
/// Реализация обязана возвращаться немедленно: никаких ожиданий, ретраев
/// и буферизации. Может вызываться конкурентно из нескольких потоков.
pub trait Delivery: Send + Sync {
    fn deliver(&self, topic: &str, payload: Vec<u8>);
}

/// Pub/sub транспорт (MQTT и т.п.).
///
/// Переподключения — забота реализации; конвейер только подключается,
/// подписывается и отключается.
pub trait Transport: Send + Sync {
    /// Установить соединение. Ошибка здесь фатальна при старте.
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Подписаться на `topic_pattern` и привязать единственный callback
    /// доставки. Реализация повторяет подписку после переподключений.
    fn subscribe(
        &self,
        topic_pattern: &str,
        delivery: Arc<dyn Delivery>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send + '_>>;

    /// Отключиться, дождавшись не дольше `grace`.
    fn disconnect(&self, grace: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

// ════════════════════════════════════════════════════════════════
//  Time-series sink
// ════════════════════════════════════════════════════════════════

/// Асинхронный поток ошибок записи в sink.
pub trait SinkErrors: Send {
    /// Следующая ошибка. None = sink закрыт.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<ClientError>> + Send + '_>>;
}

/// Клиент хранилища временных рядов с фоновым батчингом.
pub trait TimeSeriesSink: Send + Sync {
    /// Передать точку клиенту. Не блокирует и не ждёт подтверждения сети.
    fn submit(&self, point: DataPoint);

    /// Поток асинхронных ошибок записи. Отдаётся один раз; повторный
    /// вызов возвращает None.
    fn errors(&self) -> Option<Box<dyn SinkErrors>>;

    /// Дождаться, пока всё ранее переданное уйдёт в сеть.
    fn flush(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Закрыть клиент. Точки, переданные после закрытия, отбрасываются.
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
