use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::notifier::WebhookNotifier;
use adapter::redis::RedisClient;
use adapter::repository::auth::AuthRepositoryImpl;
use adapter::repository::health::HealthCheckRepositoryImpl;
use adapter::repository::reservation::ReservationRepositoryImpl;
use adapter::repository::slot::SlotRepositoryImpl;
use adapter::repository::user::UserRepositoryImpl;
use kernel::model::reservation::countdown::ExpiryScheduler;
use kernel::notifier::AdminNotifier;
use kernel::repository::auth::AuthRepository;
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::reservation::ReservationRepository;
use kernel::repository::slot::SlotRepository;
use kernel::repository::user::UserRepository;
use shared::config::{AppConfig, BookingConfig};

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    slot_repository: Arc<dyn SlotRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
    user_repository: Arc<dyn UserRepository>,
    auth_repository: Arc<dyn AuthRepository>,
    admin_notifier: Arc<dyn AdminNotifier>,
    expiry_scheduler: Arc<ExpiryScheduler>,
    booking_config: BookingConfig,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, redis_client: Arc<RedisClient>, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let slot_repository = Arc::new(SlotRepositoryImpl::new(pool.clone()));
        let reservation_repository = Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        let user_repository = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let auth_repository = Arc::new(AuthRepositoryImpl::new(
            pool.clone(),
            redis_client.clone(),
            app_config.auth.ttl,
        ));
        let admin_notifier = Arc::new(WebhookNotifier::new(&app_config.notifier));
        Self {
            health_check_repository,
            slot_repository,
            reservation_repository,
            user_repository,
            auth_repository,
            admin_notifier,
            expiry_scheduler: Arc::new(ExpiryScheduler::new()),
            booking_config: app_config.booking,
        }
    }

    // テストでリポジトリの実装を差し替えるためのコンストラクタ
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        health_check_repository: Arc<dyn HealthCheckRepository>,
        slot_repository: Arc<dyn SlotRepository>,
        reservation_repository: Arc<dyn ReservationRepository>,
        user_repository: Arc<dyn UserRepository>,
        auth_repository: Arc<dyn AuthRepository>,
        admin_notifier: Arc<dyn AdminNotifier>,
        booking_config: BookingConfig,
    ) -> Self {
        Self {
            health_check_repository,
            slot_repository,
            reservation_repository,
            user_repository,
            auth_repository,
            admin_notifier,
            expiry_scheduler: Arc::new(ExpiryScheduler::new()),
            booking_config,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn slot_repository(&self) -> Arc<dyn SlotRepository> {
        self.slot_repository.clone()
    }

    pub fn reservation_repository(&self) -> Arc<dyn ReservationRepository> {
        self.reservation_repository.clone()
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }

    pub fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }

    pub fn admin_notifier(&self) -> Arc<dyn AdminNotifier> {
        self.admin_notifier.clone()
    }

    pub fn expiry_scheduler(&self) -> Arc<ExpiryScheduler> {
        self.expiry_scheduler.clone()
    }

    pub fn booking_config(&self) -> BookingConfig {
        self.booking_config
    }
}
