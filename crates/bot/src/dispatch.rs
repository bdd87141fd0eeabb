//! Turns chat updates into replies.
//!
//! Routing order:
//!
//! 1. Button presses (`callback`)
//! 2. `/cancel`, which always clears the chat's session
//! 3. A live session (broadcast composition) consumes the message
//! 4. Commands
//! 5. Anything else gets the help text

use tracing::{debug, info, instrument};

use boutique_core::{ProductId, ProductSummary};

use crate::broadcast::{self, Audience, ChatSession};
use crate::session::ChatId;
use crate::state::BotState;
use crate::update::{BotReply, ChatUpdate};

/// Callback prefix for category buttons (`cat_Dresses`).
pub const CATEGORY_CALLBACK_PREFIX: &str = "cat_";

/// Callback prefix for product buttons (`product_3`).
pub const PRODUCT_CALLBACK_PREFIX: &str = "product_";

/// Products shown per category in chat.
const CATEGORY_PAGE_SIZE: usize = 5;

/// Handle one update.
#[instrument(skip_all, fields(chat = %update.chat_id, user = update.user_id))]
pub async fn handle_update(state: &BotState, update: &ChatUpdate) -> BotReply {
    if let Some(data) = update.callback.as_deref() {
        return handle_callback(state, update, data.trim()).await;
    }

    if matches!(update.command(), Some(("cancel", _))) {
        return cancel(state, update.chat_id).await;
    }

    if let Some(session) = state.broadcasts().sessions().get(update.chat_id).await {
        return continue_broadcast(state, update, session).await;
    }

    match update.command() {
        Some((name, argument)) => handle_command(state, update, name, argument).await,
        None => help(state),
    }
}

async fn handle_command(
    state: &BotState,
    update: &ChatUpdate,
    name: &str,
    argument: Option<&str>,
) -> BotReply {
    debug!(command = name, "Handling command");
    let config = state.config();
    match name {
        "start" | "help" => help(state),
        "catalog" => match argument {
            Some(category) => category_products(state, category).await,
            None => categories(state).await,
        },
        "product" => match argument {
            Some(id) => product_detail(state, id).await,
            None => BotReply::text("Send /product <id> to see a product."),
        },
        "profile" => BotReply::with_link(
            "Your order count and total spent are on your profile page.",
            config.web_link("profile"),
        ),
        "cart" => BotReply::with_link(
            "Your cart is kept in the web shop. Review it and check out there.",
            config.web_link("cart"),
        ),
        "orders" => BotReply::with_link(
            "Your order history is available in the web shop.",
            config.web_link("orders"),
        ),
        "checkout" => BotReply::with_link(
            "Checkout happens in the web shop.",
            config.web_link("checkout"),
        ),
        "web" => BotReply::with_link("Open the boutique:", config.web_link("")),
        "broadcast" => match state.broadcasts().start(update.chat_id, update.user_id).await {
            Ok(()) => BotReply::text(
                "Send the message to broadcast: text, or a photo with a caption.\n\
                 Send /cancel to abort.",
            ),
            Err(e) => BotReply::text(e.to_string()),
        },
        _ => BotReply::text("Unknown command. Send /help for the list of commands."),
    }
}

async fn handle_callback(state: &BotState, update: &ChatUpdate, data: &str) -> BotReply {
    debug!(callback = data, "Handling callback");

    if let Some(action) = data.strip_prefix(broadcast::CALLBACK_PREFIX) {
        if action == "cancel" {
            return cancel(state, update.chat_id).await;
        }
        return match action.parse::<Audience>() {
            Ok(audience) => complete_broadcast(state, update.chat_id, audience).await,
            Err(e) => BotReply::text(e.to_string()),
        };
    }

    if let Some(category) = data.strip_prefix(CATEGORY_CALLBACK_PREFIX) {
        return category_products(state, category).await;
    }

    if let Some(id) = data.strip_prefix(PRODUCT_CALLBACK_PREFIX) {
        return product_detail(state, id).await;
    }

    if data == "show_catalog" {
        return categories(state).await;
    }

    BotReply::text("This button is no longer active.")
}

async fn cancel(state: &BotState, chat: ChatId) -> BotReply {
    if state.broadcasts().cancel(chat).await {
        BotReply::text("Broadcast cancelled.")
    } else {
        BotReply::text("Nothing to cancel.")
    }
}

async fn continue_broadcast(state: &BotState, update: &ChatUpdate, session: ChatSession) -> BotReply {
    match session {
        ChatSession::AwaitingBroadcastContent => {
            match state.broadcasts().submit_content(update).await {
                Ok(draft) => BotReply::text(format!(
                    "Preview:\n{}\n\nChoose the audience: all or vip. Send /cancel to abort.",
                    draft.preview()
                )),
                Err(e) => BotReply::text(e.to_string()),
            }
        }
        ChatSession::AwaitingBroadcastAudience { .. } => {
            match update.trimmed_text().map(str::parse::<Audience>) {
                Some(Ok(audience)) => complete_broadcast(state, update.chat_id, audience).await,
                _ => BotReply::text("Choose the audience: all or vip. Send /cancel to abort."),
            }
        }
    }
}

async fn complete_broadcast(state: &BotState, chat: ChatId, audience: Audience) -> BotReply {
    match state.broadcasts().choose_audience(chat, audience).await {
        Ok(broadcast) => {
            info!(
                audience = %broadcast.audience,
                "Broadcast ready for delivery"
            );
            BotReply::text(format!(
                "Broadcast for {} customers is ready:\n{}",
                broadcast.audience,
                broadcast.draft.preview()
            ))
        }
        Err(e) => BotReply::text(e.to_string()),
    }
}

fn help(state: &BotState) -> BotReply {
    BotReply::with_link(
        "Welcome to the boutique!\n\n\
         /catalog - Browse categories\n\
         /catalog <category> - Products in a category\n\
         /product <id> - Product details\n\
         /cart - Your cart\n\
         /orders - Order history\n\
         /profile - Your profile\n\
         /checkout - Place an order\n\
         /web - Open the web shop",
        state.config().web_link(""),
    )
}

async fn categories(state: &BotState) -> BotReply {
    let categories = state.catalog().categories().await;
    let link = state.config().web_link("catalog");
    if categories.is_empty() {
        return BotReply::with_link("The catalog is being updated. Browse the web shop meanwhile.", link);
    }

    let lines: Vec<String> = categories
        .iter()
        .map(|category| format!("- {category}"))
        .collect();
    BotReply::with_link(
        format!(
            "Categories:\n{}\n\nSend /catalog <category> to see products.",
            lines.join("\n")
        ),
        link,
    )
}

async fn category_products(state: &BotState, category: &str) -> BotReply {
    let products = state
        .catalog()
        .by_category(category, CATEGORY_PAGE_SIZE)
        .await;
    let link = state.config().web_link(&format!(
        "catalog?category={}",
        url::form_urlencoded::byte_serialize(category.as_bytes()).collect::<String>()
    ));

    if products.is_empty() {
        return BotReply::with_link(
            format!("{category} are available in the web shop."),
            link,
        );
    }

    let lines: Vec<String> = products.iter().map(product_line).collect();
    BotReply::with_link(
        format!(
            "{category}:\n{}\n\nShowing {} of the category.",
            lines.join("\n"),
            products.len()
        ),
        link,
    )
}

async fn product_detail(state: &BotState, raw_id: &str) -> BotReply {
    let Ok(id) = raw_id.parse::<ProductId>() else {
        return BotReply::text("Send /product <id> to see a product.");
    };
    let link = state.config().web_link(&format!("product/{id}"));
    match state.catalog().get(id).await {
        Some(product) => BotReply::with_link(
            format!(
                "{}\nArticle: {}\nCategory: {}\nPrice: {}\nIn stock: {}",
                product.name, product.article, product.category, product.price, product.stock
            ),
            link,
        ),
        None => BotReply::text("This product is not available."),
    }
}

fn product_line(product: &ProductSummary) -> String {
    format!("- {} ({}) - {}", product.name, product.article, product.price)
}
