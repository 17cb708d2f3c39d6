use crate::dataset::DEFAULT_DATASET_URL;
use crate::model::{DEFAULT_ARTIFACT_PATH, DEFAULT_RUN_ID};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "runfetch")]
#[command(version, about = "Fetch CSV datasets and load logged models from an MLflow tracking server", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Download a CSV dataset and save it locally
	Fetch {
		/// URL of the CSV document (header row first)
		#[arg(long, env = "RUNFETCH_DATASET_URL", default_value = DEFAULT_DATASET_URL)]
		url: String,

		/// Where to write the dataset
		#[arg(long, short, default_value = "data.csv")]
		output: PathBuf,

		/// Number of rows to preview (0 to disable)
		#[arg(long, default_value = "5")]
		preview: usize,
	},

	/// Load a logged model from the tracking server by run ID
	Load {
		/// Run ID shown in the tracking UI
		#[arg(long, env = "RUNFETCH_RUN_ID", default_value = DEFAULT_RUN_ID)]
		run_id: String,

		/// Artifact path the model was logged under
		#[arg(long, default_value = DEFAULT_ARTIFACT_PATH)]
		artifact_path: String,
	},

	/// List models loaded so far
	List,
}
