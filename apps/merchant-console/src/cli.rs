//! Command-line surface of the console.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and persist the session.
    Login { email: String, password: String },
    /// Sign out and clear the local session.
    Logout,
    /// Create a merchant account.
    Register { email: String, password: String },
    /// Activate an account with the emailed code.
    Activate { code: String },
    /// Manage the product catalogue.
    #[command(subcommand)]
    Products(ProductsCommand),
    /// Track and ship orders.
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// Moderate product reviews.
    #[command(subcommand)]
    Reviews(ReviewsCommand),
    /// Upload product images and print their ids.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Resolve a console path through the route guard.
    Navigate { path: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ProductsCommand {
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        offset: Option<u32>,
        /// 0: newest update first, 1: oldest update first.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
        order_by: Option<u8>,
    },
    Get {
        id: u64,
    },
    Add(NewProductArgs),
    Publish {
        id: u64,
    },
    Unpublish {
        id: u64,
    },
    Stock {
        id: u64,
        stock: i64,
    },
    Edit(EditProductArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct NewProductArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub price: f64,
    #[arg(long)]
    pub stock: i64,
    #[arg(long, default_value = "")]
    pub desc: String,
    #[command(flatten)]
    pub details: ProductDetailArgs,
    /// Image files uploaded before the product is created.
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct EditProductArgs {
    pub id: u64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub desc: Option<String>,
    #[command(flatten)]
    pub details: ProductDetailArgs,
    /// Replacement image files.
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetailArgs {
    #[arg(long)]
    pub dimensions: Option<String>,
    #[arg(long)]
    pub material: Option<String>,
    #[arg(long)]
    pub weight: Option<String>,
    #[arg(long)]
    pub capacity: Option<String>,
    #[arg(long)]
    pub care_instructions: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum OrdersCommand {
    List {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Defaults to `MERCHANT_ORDER_PAGE_SIZE`.
        #[arg(long)]
        limit: Option<u32>,
        /// Status label (`Paid`) or code (`2`).
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        order_no: Option<String>,
    },
    Detail {
        order_no: String,
    },
    Ship {
        order_no: String,
        tracking_no: String,
    },
    /// Dashboard totals.
    Stats,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReviewsCommand {
    List {
        #[arg(long)]
        product_id: Option<u64>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
        stars: Option<u8>,
    },
    Reply {
        review_id: String,
        product_id: u64,
        content: String,
        #[arg(long)]
        anonymous: bool,
    },
    Delete {
        review_id: String,
    },
    Pin {
        review_id: String,
    },
    Unpin {
        review_id: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Command {
        let argv = std::iter::once("merchant-console").chain(args.iter().copied());
        Cli::try_parse_from(argv).expect("args should parse").command
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_product_add_with_images() {
        let command = parse(&[
            "products", "add", "--name", "Bowl", "--category", "bowls", "--price", "18.5",
            "--stock", "4", "--image", "a.png", "--image", "b.jpg",
        ]);
        let Command::Products(ProductsCommand::Add(args)) = command else {
            panic!("unexpected command: {command:?}");
        };
        assert_eq!(args.name, "Bowl");
        assert_eq!(args.desc, "");
        assert_eq!(args.images, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
    }

    #[test]
    fn parses_order_list_defaults() {
        assert_eq!(
            parse(&["orders", "list"]),
            Command::Orders(OrdersCommand::List {
                offset: 0,
                limit: None,
                status: None,
                order_no: None,
            })
        );
    }

    #[test]
    fn rejects_out_of_range_stars() {
        let argv = ["merchant-console", "reviews", "list", "--stars", "6"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
