use std::net::SocketAddr;

use clap::Parser;
use jendo::cli::{
    Args, build_config, handle_issue_token, init_logging, lifetimes, load_jwt_secret,
    open_database, validate_chatbot_endpoint,
};
use jendo::create_app;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.issue_token.as_deref()
        && handle_issue_token(&db, &jwt_secret, lifetimes(&args), email)
            .await
            .is_none()
    {
        std::process::exit(1);
    }

    let Some(chatbot_endpoint) = validate_chatbot_endpoint(&args.chatbot_endpoint) else {
        std::process::exit(1);
    };

    let config = build_config(&args, db, jwt_secret, chatbot_endpoint);
    if config.chatbot.api_key.is_none() {
        info!("No chatbot API key configured, chatbot answers with a notice");
    }

    let app = create_app(&config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build application");
        std::process::exit(1);
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
