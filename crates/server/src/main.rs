use std::borrow::Cow;
use std::process::ExitCode;

use av_http::form::Form;
use av_http::protocol::Request;
use av_server::{ConnectionHandle, ConnectionRegistry, Options, ReactorPool, Server};
use clap::Parser;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Serialize)]
struct Echo<'a> {
    method: &'a str,
    uri: &'a str,
    version: String,
    query: Vec<(&'a str, &'a str)>,
    form: Vec<(&'a str, Cow<'a, str>)>,
}

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    let options = Options::parse();
    info!(?options, "starting avrouter");

    let pool = match ReactorPool::new(usize::from(options.threads)) {
        Ok(pool) => pool,
        Err(e) => {
            error!(cause = %e, "failed to build reactor pool");
            return ExitCode::FAILURE;
        }
    };

    let server = Server::new(&pool, &options.address, options.http_port);
    if let Err(e) = server.add_route("/ping", ping).and_then(|()| server.add_route("/echo", echo)) {
        error!(cause = %e, "failed to register routes");
        return ExitCode::FAILURE;
    }
    server.start();

    let stop = pool.stop_handle();
    let signal_server = server.clone();
    pool.next().spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c, shutting down"),
            Err(e) => error!(cause = %e, "failed to listen for ctrl-c, shutting down"),
        }
        signal_server.stop();
        stop.stop();
    });

    if let Err(e) = pool.run() {
        error!(cause = %e, "reactor pool failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn ping(_: &Request, connection: &ConnectionHandle, _: &ConnectionRegistry) {
    connection.write_response(r#"{"pong":true}"#);
}

fn echo(request: &Request, connection: &ConnectionHandle, _: &ConnectionRegistry) {
    let form = Form::parse(request.header(CONTENT_TYPE.as_str()).unwrap_or_default(), request.body());
    let echo = Echo {
        method: request.method(),
        uri: request.uri(),
        version: request.version().to_string(),
        query: request.query().iter().map(|(key, value)| (key.as_str(), value.as_str())).collect(),
        form: form.iter().map(|(key, value)| (key, String::from_utf8_lossy(value))).collect(),
    };

    match serde_json::to_vec(&echo) {
        Ok(body) => connection.write_response(body),
        Err(e) => {
            error!(cause = %e, "failed to serialize echo");
            connection.write_raw_response("HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n", "");
        }
    }
}
