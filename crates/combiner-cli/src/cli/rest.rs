use anyhow::{bail, Context};
use cb_domain::config::CombinerConfig;
use cb_rest::CombinerRestClient;
use serde_json::{Map, Value};

use super::{DbCommand, FsCommand};

fn print_value(value: &Value) -> anyhow::Result<()> {
    match value {
        Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn parse_json(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("invalid JSON: {raw}"))
}

fn parse_filter(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match parse_json(raw)? {
        Value::Object(map) => Ok(map),
        other => bail!("filter must be a JSON object, got {other}"),
    }
}

pub async fn token(config: &CombinerConfig) -> anyhow::Result<()> {
    let client = CombinerRestClient::new(config)?;
    println!("{}", client.session_token().await?);
    Ok(())
}

pub async fn fs(config: &CombinerConfig, cmd: FsCommand) -> anyhow::Result<()> {
    let client = CombinerRestClient::new(config)?;
    let value = match cmd {
        FsCommand::Ls { path } => client.list_dir(&path).await?,
        FsCommand::Read { path, encoding } => client.read_file(&path, encoding.as_deref()).await?,
        FsCommand::Write {
            path,
            content,
            encoding,
        } => {
            client
                .write_file(&path, &content, encoding.as_deref())
                .await?
        }
    };
    print_value(&value)
}

pub async fn db(config: &CombinerConfig, cmd: DbCommand) -> anyhow::Result<()> {
    let client = CombinerRestClient::new(config)?;
    let value = match cmd {
        DbCommand::Create { collection, json } => {
            client.db_create(&collection, &parse_json(&json)?).await?
        }
        DbCommand::List { collection, filter } => {
            let filter = filter.as_deref().map(parse_filter).transpose()?;
            Value::Array(client.db_list(&collection, filter.as_ref()).await?)
        }
        DbCommand::Read { collection, id } => client.db_read(&collection, &id).await?,
        DbCommand::Update {
            collection,
            id,
            json,
        } => client.db_update(&collection, &id, &parse_json(&json)?).await?,
        DbCommand::Delete { collection, id } => client.db_delete(&collection, &id).await?,
    };
    print_value(&value)
}
