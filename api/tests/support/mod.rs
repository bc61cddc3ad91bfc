// 予約フローのテストで使う、リポジトリ群のインメモリ実装。
// 単一の Mutex で全状態を守ることで、reserve のチェックと書き込みが
// 本実装のトランザクションと同じく不可分になる
use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use kernel::model::{
    auth::{event::CreateToken, AccessToken},
    id::{ReservationId, SlotId, UserId},
    reservation::{
        event::{ConfirmPayment, ReserveSlot, UpdateReservationStatus},
        Reservation, ReservationStatus,
    },
    role::Role,
    slot::{event::CreateSlot, Slot, SlotStatus},
    user::{KycStatus, User},
};
use kernel::notifier::{AdminNotice, AdminNotifier};
use kernel::repository::{
    auth::AuthRepository, health::HealthCheckRepository, reservation::ReservationRepository,
    slot::SlotRepository, user::UserRepository,
};
use registry::AppRegistry;
use shared::config::BookingConfig;
use shared::error::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StoreState {
    slots: HashMap<SlotId, Slot>,
    reservations: HashMap<ReservationId, Reservation>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    // テストから期限を直接動かすためのヘルパ
    pub fn set_payment_deadline(&self, reservation_id: ReservationId, deadline: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .expect("reservation should exist");
        reservation.payment_deadline = deadline;
    }

    // 取消の適用直前に入金確認が割り込んだ状況を作るためのヘルパ
    pub fn mark_payment_confirmed(&self, reservation_id: ReservationId) {
        let mut state = self.state.lock().unwrap();
        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .expect("reservation should exist");
        reservation.status = ReservationStatus::PaymentConfirmed;
        reservation.payment_confirmed = true;
        reservation.payment_confirmed_at = Some(Utc::now());
    }

    pub fn slot_status(&self, slot_id: SlotId) -> SlotStatus {
        self.state.lock().unwrap().slots[&slot_id].status
    }

    pub fn reservation_status(&self, reservation_id: ReservationId) -> ReservationStatus {
        self.state.lock().unwrap().reservations[&reservation_id].status
    }

    pub fn reservation_count(&self) -> usize {
        self.state.lock().unwrap().reservations.len()
    }
}

#[async_trait]
impl SlotRepository for FakeStore {
    async fn create(&self, event: CreateSlot) -> AppResult<SlotId> {
        let slot_id = SlotId::new();
        let mut state = self.state.lock().unwrap();
        state.slots.insert(
            slot_id,
            Slot {
                slot_id,
                start_time: event.start_time,
                end_time: event.end_time,
                status: SlotStatus::Available,
            },
        );
        Ok(slot_id)
    }

    async fn find_available_by_date(&self, date: NaiveDate) -> AppResult<Vec<Slot>> {
        let state = self.state.lock().unwrap();
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|s| s.status == SlotStatus::Available && s.start_time.date_naive() == date)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn find_by_id(&self, slot_id: SlotId) -> AppResult<Option<Slot>> {
        Ok(self.state.lock().unwrap().slots.get(&slot_id).cloned())
    }
}

#[async_trait]
impl ReservationRepository for FakeStore {
    async fn reserve(&self, event: ReserveSlot) -> AppResult<ReservationId> {
        let mut state = self.state.lock().unwrap();

        let Some(slot) = state.slots.get(&event.slot_id) else {
            return Err(AppError::SlotNotFound(format!(
                "スロット（{}）が見つかりませんでした。",
                event.slot_id
            )));
        };
        if slot.status != SlotStatus::Available {
            return Err(AppError::SlotAlreadyBooked(format!(
                "スロット（{}）は直前に他のお客様に予約されました。",
                event.slot_id
            )));
        }

        let reservation_id = ReservationId::new();
        state.reservations.insert(
            reservation_id,
            Reservation {
                reservation_id,
                slot_id: event.slot_id,
                user_id: event.user_id,
                user_name: event.user_name,
                email: event.email,
                slot_date: event.slot_date,
                slot_time: event.slot_time,
                status: ReservationStatus::PaymentRequired,
                created_at: event.created_at,
                payment_confirmed: false,
                payment_confirmed_at: None,
                payment_deadline: event.payment_deadline,
            },
        );
        let slot = state.slots.get_mut(&event.slot_id).unwrap();
        slot.status = SlotStatus::Booked;

        Ok(reservation_id)
    }

    async fn confirm_payment(&self, event: ConfirmPayment) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        let matched = state.reservations.get_mut(&event.reservation_id).filter(|r| {
            r.user_id == event.user_id && r.status == ReservationStatus::PaymentRequired
        });
        let Some(reservation) = matched else {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（{}）の入金確認を記録できませんでした。",
                event.reservation_id
            )));
        };
        reservation.status = ReservationStatus::PaymentConfirmed;
        reservation.payment_confirmed = true;
        reservation.payment_confirmed_at = Some(event.confirmed_at);
        Ok(())
    }

    async fn transition(&self, event: UpdateReservationStatus) -> AppResult<()> {
        if !event.expected.can_transition_to(event.next) {
            return Err(AppError::UnprocessableEntity(format!(
                "予約の状態を {} から {} に変更することはできません。",
                event.expected, event.next
            )));
        }
        let mut state = self.state.lock().unwrap();
        let Some(reservation) = state
            .reservations
            .get_mut(&event.reservation_id)
            .filter(|r| r.status == event.expected)
        else {
            return Err(AppError::UnprocessableEntity(format!(
                "予約（{}）の状態が {} ではないため、操作を適用できませんでした。",
                event.reservation_id, event.expected
            )));
        };
        reservation.status = event.next;
        let slot_id = reservation.slot_id;
        if event.next.releases_slot() {
            state.slots.get_mut(&slot_id).unwrap().status = SlotStatus::Available;
        }
        Ok(())
    }

    async fn cancel(&self, reservation_id: ReservationId, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(reservation) = state
            .reservations
            .get_mut(&reservation_id)
            .filter(|r| r.user_id == user_id && !r.status.is_terminal())
        else {
            return Err(AppError::EntityNotFound(format!(
                "取消できる予約（{}）が見つかりませんでした。",
                reservation_id
            )));
        };
        reservation.status = ReservationStatus::Cancelled;
        let slot_id = reservation.slot_id;
        state.slots.get_mut(&slot_id).unwrap().status = SlotStatus::Available;
        Ok(())
    }

    async fn expire(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SlotId>> {
        let mut state = self.state.lock().unwrap();
        let Some(reservation) = state.reservations.get_mut(&reservation_id).filter(|r| {
            r.status == ReservationStatus::PaymentRequired && r.payment_deadline <= now
        }) else {
            return Ok(None);
        };
        reservation.status = ReservationStatus::Cancelled;
        let slot_id = reservation.slot_id;
        state.slots.get_mut(&slot_id).unwrap().status = SlotStatus::Available;
        Ok(Some(slot_id))
    }

    async fn delete(&self, reservation_id: ReservationId) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(reservation) = state.reservations.remove(&reservation_id) else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{}）が見つかりませんでした。",
                reservation_id
            )));
        };
        if !reservation.status.is_terminal() {
            state.slots.get_mut(&reservation.slot_id).unwrap().status = SlotStatus::Available;
        }
        Ok(())
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reservations
            .get(&reservation_id)
            .cloned())
    }

    async fn find_active_by_user_id(&self, user_id: UserId) -> AppResult<Option<Reservation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reservations
            .values()
            .find(|r| r.user_id == user_id && !r.status.is_terminal())
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .state
            .lock()
            .unwrap()
            .reservations
            .values()
            .cloned()
            .collect();
        // 進行中の予約を先頭に、新しい順で並べる
        reservations.sort_by_key(|r| (r.status.is_terminal(), std::cmp::Reverse(r.created_at)));
        Ok(reservations)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reservations
            .values()
            .filter(|r| {
                r.status == ReservationStatus::PaymentRequired && r.payment_deadline <= now
            })
            .cloned()
            .collect())
    }
}

pub struct FakeHealthCheck;

#[async_trait]
impl HealthCheckRepository for FakeHealthCheck {
    async fn check_db(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct FakeUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl FakeUserRepository {
    pub fn add(&self, user: User) {
        self.users.lock().unwrap().insert(user.user_id, user);
    }
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&current_user_id).cloned())
    }
}

#[derive(Default)]
pub struct FakeAuthRepository {
    tokens: Mutex<HashMap<String, UserId>>,
}

impl FakeAuthRepository {
    pub fn issue_token(&self, user_id: UserId) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.lock().unwrap().insert(token.clone(), user_id);
        token
    }
}

#[async_trait]
impl AuthRepository for FakeAuthRepository {
    async fn fetch_user_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<UserId>> {
        Ok(self.tokens.lock().unwrap().get(&access_token.0).copied())
    }

    async fn verify_user(&self, _email: &str, _password: &str) -> AppResult<UserId> {
        Err(AppError::UnauthenticatedError)
    }

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken> {
        Ok(AccessToken(self.issue_token(event.user_id)))
    }

    async fn delete_token(&self, access_token: AccessToken) -> AppResult<()> {
        self.tokens.lock().unwrap().remove(&access_token.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<AdminNotice>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.subject.clone())
            .collect()
    }
}

#[async_trait]
impl AdminNotifier for RecordingNotifier {
    async fn notify(&self, notice: AdminNotice) -> AppResult<()> {
        self.notices.lock().unwrap().push(notice);
        Ok(())
    }
}

// ルーター＋フェイク一式を束ねたテスト用アプリケーション
pub struct TestApp {
    pub router: Router,
    pub registry: AppRegistry,
    pub store: Arc<FakeStore>,
    pub users: Arc<FakeUserRepository>,
    pub auth: Arc<FakeAuthRepository>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_reservation_repository(|store| store)
    }

    // 予約リポジトリだけを差し替えたアプリを組み立てる。
    // 競合の割り込みを再現するラッパーをかぶせるために使う
    pub fn with_reservation_repository(
        wrap: impl FnOnce(Arc<FakeStore>) -> Arc<dyn ReservationRepository>,
    ) -> Self {
        let store = Arc::new(FakeStore::default());
        let users = Arc::new(FakeUserRepository::default());
        let auth = Arc::new(FakeAuthRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let registry = AppRegistry::from_parts(
            Arc::new(FakeHealthCheck),
            store.clone(),
            wrap(store.clone()),
            users.clone(),
            auth.clone(),
            notifier.clone(),
            BookingConfig::default(),
        );

        let router = Router::new()
            .merge(api::route::v1::routes())
            .merge(api::route::auth::routes())
            .with_state(registry.clone());

        Self {
            router,
            registry,
            store,
            users,
            auth,
            notifier,
        }
    }

    // KYC 承認済みの一般ユーザーを登録し、アクセストークンを返す
    pub fn register_approved_user(&self, user_name: &str, email: &str) -> (UserId, String) {
        self.register_user(user_name, email, Role::User, KycStatus::Approved)
    }

    pub fn register_user(
        &self,
        user_name: &str,
        email: &str,
        role: Role,
        kyc_status: KycStatus,
    ) -> (UserId, String) {
        let user_id = UserId::new();
        self.users.add(User {
            user_id,
            user_name: user_name.to_string(),
            email: email.to_string(),
            role,
            kyc_status,
        });
        let token = self.auth.issue_token(user_id);
        (user_id, token)
    }

    pub async fn add_slot(&self, start_time: DateTime<Utc>) -> SlotId {
        SlotRepository::create(
            self.store.as_ref(),
            CreateSlot::new(start_time, start_time + chrono::Duration::hours(1)),
        )
        .await
        .expect("slot creation should succeed")
    }
}
