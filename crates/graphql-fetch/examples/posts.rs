//! Fetch the newest posts from the public GraphQLZero API.
//!
//! ```text
//! RUST_LOG=graphql_fetch=debug cargo run -p graphql-fetch --example posts
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use graphql_fetch::{Endpoint, Transport, TypedDocument, build_key};

const ENDPOINT: &str = "https://graphqlzero.almansi.me/api";

const POSTS: &str = r"
    query Posts($options: PageQueryOptions) {
        posts(options: $options) {
            data { id title }
            meta { totalCount }
        }
    }
";

#[derive(Debug, Serialize)]
struct PostsVars {
    options: PageOptions,
}

#[derive(Debug, Serialize)]
struct PageOptions {
    paginate: Paginate,
    sort: Sort,
}

#[derive(Debug, Serialize)]
struct Paginate {
    limit: u32,
}

#[derive(Debug, Serialize)]
struct Sort {
    field: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: PostsPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostsPage {
    data: Vec<Post>,
    meta: PageMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let endpoint = Endpoint::default();
    endpoint.set(ENDPOINT);
    let transport = Transport::new(endpoint);

    let posts: TypedDocument<PostsData, PostsVars> = TypedDocument::parse(POSTS)?;
    let vars = PostsVars {
        options: PageOptions {
            paginate: Paginate { limit: 10 },
            sort: Sort {
                field: "id",
                order: "DESC",
            },
        },
    };

    let key = build_key(posts.operation_name().unwrap_or_default(), Some(&vars), None)?;
    println!("cache key: {key}");

    let data = transport.execute(&posts, Some(&vars)).await?;
    println!("{} posts in total, newest {}:", data.posts.meta.total_count, data.posts.data.len());
    for post in data.posts.data {
        println!("  #{:>3} {}", post.id, post.title);
    }
    Ok(())
}
