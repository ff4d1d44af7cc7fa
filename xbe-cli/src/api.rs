//! `xbe api` commands: raw JSON:API requests against the configured backend.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use serde_json::Value;
use tracing::debug;
use xbe_core::{
    Client, CredentialStore, Document, Query, ResolveError, Resource, Response, SortKey,
    TokenResolver, XbeError, attrs,
};

use crate::Globals;

/// Attributes tried, in order, when labelling a resource with `--ids`.
const LABEL_ATTRIBUTES: [&str; 5] = ["name", "display-name", "title", "number", "email"];

#[derive(Subcommand)]
pub enum ApiCommand {
    /// GET a path and print the response
    Get {
        /// Request path, e.g. /v1/material-types
        path: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Print one line per resource: type, id, and a label
        #[arg(long)]
        ids: bool,
    },

    /// POST a JSON body to a path
    Post {
        path: String,

        /// Request body (a JSON:API document)
        #[arg(long)]
        body: String,
    },

    /// PATCH a JSON body to a path
    Patch {
        path: String,

        /// Request body (a JSON:API document)
        #[arg(long)]
        body: String,
    },

    /// DELETE a path
    Delete { path: String },
}

/// JSON:API query options.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Sparse fieldset as TYPE=FIELD,FIELD (repeatable)
    #[arg(long = "fields", value_name = "TYPE=FIELDS")]
    fields: Vec<String>,

    /// Relationships to include (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Filter as NAME=VALUE (repeatable)
    #[arg(long = "filter", value_name = "NAME=VALUE")]
    filter: Vec<String>,

    /// Page size
    #[arg(long)]
    limit: Option<u32>,

    /// Page offset
    #[arg(long)]
    offset: Option<u32>,

    /// Sort keys, `-` prefix for descending (comma-separated)
    #[arg(long, value_delimiter = ',')]
    sort: Vec<String>,
}

impl QueryArgs {
    fn to_query(&self) -> Result<Query> {
        let mut query = Query::new();

        for pair in &self.fields {
            let (resource_type, fields) = split_pair(pair, "--fields")?;
            let fields: Vec<&str> = fields.split(',').collect();
            query = query.fields(resource_type, &fields);
        }

        query = query.include(&self.include);

        for pair in &self.filter {
            let (name, value) = split_pair(pair, "--filter")?;
            query = query.filter(name, value);
        }

        if let Some(limit) = self.limit {
            query = query.page_limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.page_offset(offset);
        }

        let sort: Vec<SortKey> = self
            .sort
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| SortKey::parse(s))
            .collect();
        Ok(query.sort(&sort))
    }
}

fn split_pair<'a>(pair: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => bail!("{} expects KEY=VALUE, got '{}'", flag, pair),
    }
}

pub async fn run(command: ApiCommand, globals: &Globals) -> Result<()> {
    let client = client(globals).await?;

    match command {
        ApiCommand::Get { path, query, ids } => {
            let query = query.to_query()?;
            let response = client
                .get(&globals.ctx, &path, &query)
                .await
                .map_err(XbeError::from)?;
            if ids {
                let doc = response.decode().map_err(XbeError::from)?;
                print_ids(&doc);
            } else {
                print_body(&response);
            }
        }
        ApiCommand::Post { path, body } => {
            let body = parse_body(&body)?;
            let response = client
                .post(&globals.ctx, &path, body)
                .await
                .map_err(XbeError::from)?;
            print_body(&response);
        }
        ApiCommand::Patch { path, body } => {
            let body = parse_body(&body)?;
            let response = client
                .patch(&globals.ctx, &path, body)
                .await
                .map_err(XbeError::from)?;
            print_body(&response);
        }
        ApiCommand::Delete { path } => {
            let response = client
                .delete(&globals.ctx, &path)
                .await
                .map_err(XbeError::from)?;
            if response.is_empty() {
                println!("Deleted {}", path);
            } else {
                print_body(&response);
            }
        }
    }
    Ok(())
}

/// Build a client for the configured base URL, resolving a token unless
/// `--no-auth` was given. With no token found the request goes out
/// unauthenticated and the server decides.
async fn client(globals: &Globals) -> Result<Client> {
    if globals.no_auth {
        let client = Client::new(globals.base_url.clone(), None).map_err(XbeError::from)?;
        return Ok(client);
    }

    let store = CredentialStore::open_default().ok();
    let resolver = match &store {
        Some(store) => TokenResolver::new(store),
        None => TokenResolver::without_store(),
    };

    let token = match resolver
        .resolve(&globals.ctx, &globals.base_url, globals.token.as_deref())
        .await
    {
        Ok(resolved) => {
            debug!("using token from {}", resolved.source);
            Some(resolved.token)
        }
        Err(ResolveError::NotFound { .. }) => {
            debug!("no token for {}; sending unauthenticated", globals.base_url);
            None
        }
        Err(e) => return Err(XbeError::from(e).into()),
    };

    let client = Client::new(globals.base_url.clone(), token).map_err(XbeError::from)?;
    Ok(client)
}

fn parse_body(body: &str) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
    Ok(value.to_string().into_bytes())
}

fn print_body(response: &Response) {
    if response.is_empty() {
        return;
    }
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", String::from_utf8_lossy(&response.body)),
        },
        Err(_) => println!("{}", String::from_utf8_lossy(&response.body)),
    }
}

fn print_ids(doc: &Document) {
    for resource in doc.resources() {
        println!("{}\t{}\t{}", resource.resource_type, resource.id, label(resource));
    }
}

fn label(resource: &Resource) -> String {
    LABEL_ATTRIBUTES
        .iter()
        .map(|key| attrs::string_attr(&resource.attributes, key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
