use actix_cors::Cors;
use actix_web::{App, HttpServer};
use std::io;
use tracing_subscriber::EnvFilter;

mod approval;
mod database;
mod directory;
mod error;
mod models;
mod routes;
mod safety;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_uri: String =
        std::env::var("MONGODB_URI").unwrap_or_else(|_| String::from("mongodb://localhost:27017"));
    let bind_address: String =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| String::from("127.0.0.1:8000"));

    database::connect(db_uri).await;
    models::user::load_keys();

    tracing::info!(address = %bind_address, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .wrap(models::user::UserAuthenticationMiddlewareFactory)
            .service(routes::user::get_users)
            .service(routes::user::get_user)
            .service(routes::user::create_user)
            .service(routes::user::login)
            .service(routes::company::get_company)
            .service(routes::company::create_company)
            .service(routes::project::get_project)
            .service(routes::project::create_project)
            .service(routes::project::add_project_member)
            .service(routes::role::get_custom_role)
            .service(routes::role::create_custom_role)
            .service(routes::role::assign_custom_role)
            .service(routes::workflow::get_workflows)
            .service(routes::workflow::get_workflow)
            .service(routes::workflow::create_workflow)
            .service(routes::approval::create_request)
            .service(routes::approval::get_request)
            .service(routes::approval::get_approvers)
            .service(routes::approval::can_approve)
            .service(routes::approval::post_action)
            .service(routes::approval::get_actions)
            .service(routes::safety::create_incident)
            .service(routes::safety::get_incidents)
            .service(routes::safety::get_spikes)
            .service(routes::safety::get_hotspots)
            .service(routes::safety::delete_incident)
            .service(routes::safety::create_hours)
            .service(routes::safety::compute_single_rate)
            .service(routes::safety::aggregate_metrics)
            .service(routes::safety::upsert_snapshot)
            .service(routes::safety::get_snapshots)
    })
    .bind(bind_address)?
    .run()
    .await
}
