pub(crate) mod handlers;
pub(crate) mod models;
pub(crate) mod notification;
pub(crate) mod router;
mod screens;
pub(crate) mod utils;

use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
};

pub use router::State;

pub fn init(token: String) -> Bot {
    Bot::new(token)
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::dialogue::InMemStorage;
    use teloxide::types::Update;
    use crate::bot::handlers::{self, Command};

    dptree::entry()
        .enter_dialogue::<Update, InMemStorage<State>, State>()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::case![State::WaitingForAckNotes { alert_id, page, filter }]
                        .endpoint(handlers::handle_ack_notes),
                )
                .branch(
                    dptree::case![State::WaitingForSearchQuery { page, filter }]
                        .endpoint(handlers::handle_search_query),
                )
                .branch(dptree::case![State::WaitingForBusinessId].endpoint(handlers::handle_business_id))
                .branch(
                    dptree::case![State::WaitingForMonitoringName { business_id }]
                        .endpoint(handlers::handle_monitoring_name),
                )
                .branch(dptree::case![State::WaitingForUserId].endpoint(handlers::handle_user_id)),
        )
        .endpoint(|update: Update| async move {
            warn!("Необработанный апдейт: {:?}", update.id);
            Ok::<(), anyhow::Error>(())
        })
}
