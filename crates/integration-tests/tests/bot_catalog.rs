//! Chat bot against a live storefront.
//!
//! Both services run on ephemeral local ports; the bot mirrors the
//! storefront's catalog feed over HTTP and answers webhook updates.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use boutique_bot::config::BotConfig;
use boutique_bot::state::BotState;
use boutique_core::ProductId;
use boutique_integration_tests::{serve, spawn_storefront};
use boutique_storefront::db::{MemoryStore, Store};
use boutique_storefront::seed::seed_demo;

const ADMIN: i64 = 900;

struct Fixture {
    client: Client,
    store: Store,
    bot: BotState,
    bot_url: String,
    storefront_url: String,
}

async fn fixture() -> Fixture {
    let store = Store::Memory(MemoryStore::new());
    seed_demo(&store).await.unwrap();
    let storefront_url = spawn_storefront(store.clone()).await;

    let web_app_url = storefront_url.clone();
    let config = BotConfig::from_lookup(move |key| match key {
        "BOT_WEB_APP_URL" => Some(web_app_url.clone()),
        "BOT_ADMIN_IDS" => Some(ADMIN.to_string()),
        _ => None,
    })
    .unwrap();
    let bot = BotState::new(config);
    let bot_url = serve(boutique_bot::routes::app(bot.clone())).await;

    Fixture {
        client: Client::new(),
        store,
        bot,
        bot_url,
        storefront_url,
    }
}

impl Fixture {
    async fn send(&self, update: Value) -> Value {
        let response = self
            .client
            .post(format!("{}/updates", self.bot_url))
            .json(&update)
            .send()
            .await
            .expect("Failed to reach bot");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.expect("Bot reply is not JSON")
    }
}

#[tokio::test]
async fn test_bot_mirrors_storefront_catalog() {
    let fx = fixture().await;

    assert_eq!(fx.bot.catalog().refresh().await.unwrap(), 5);

    let reply = fx
        .send(json!({ "chat_id": 1, "user_id": 1, "text": "/catalog Dresses" }))
        .await;
    let text = reply["text"].as_str().unwrap();
    assert!(text.contains("VOGUE001"));
    assert!(text.contains("VOGUE005"));
    assert!(text.contains("30000"));
    assert_eq!(
        reply["link"],
        format!("{}/catalog?category=Dresses", fx.storefront_url)
    );
}

#[tokio::test]
async fn test_withdrawn_product_leaves_mirror_on_refresh() {
    let fx = fixture().await;
    fx.bot.catalog().refresh().await.unwrap();

    fx.store
        .set_product_active(ProductId::new(1), false)
        .await
        .unwrap();
    assert_eq!(fx.bot.catalog().refresh().await.unwrap(), 4);

    let articles: Vec<String> = fx
        .bot
        .catalog()
        .all(10)
        .await
        .into_iter()
        .map(|p| p.article)
        .collect();
    assert!(!articles.iter().any(|a| a == "VOGUE001"));
}

#[tokio::test]
async fn test_commands_link_to_storefront() {
    let fx = fixture().await;

    for (command, path) in [("/cart", "cart"), ("/orders", "orders"), ("/checkout", "checkout")] {
        let reply = fx
            .send(json!({ "chat_id": 3, "user_id": 3, "text": command }))
            .await;
        assert_eq!(reply["link"], format!("{}/{path}", fx.storefront_url));
    }
}

#[tokio::test]
async fn test_admin_broadcast_round_trip() {
    let fx = fixture().await;

    let reply = fx
        .send(json!({ "chat_id": ADMIN, "user_id": ADMIN, "text": "/broadcast" }))
        .await;
    assert!(reply["text"].as_str().unwrap().starts_with("Send the message"));

    fx.send(json!({ "chat_id": ADMIN, "user_id": ADMIN, "text": "Weekend sale" }))
        .await;
    let reply = fx
        .send(json!({ "chat_id": ADMIN, "user_id": ADMIN, "text": "all" }))
        .await;
    assert_eq!(
        reply["text"],
        "Broadcast for all customers is ready:\nWeekend sale"
    );

    let reply = fx
        .send(json!({ "chat_id": ADMIN, "user_id": ADMIN, "callback": "broadcast_vip" }))
        .await;
    assert_eq!(reply["text"], "session expired, start again with /broadcast");
}
