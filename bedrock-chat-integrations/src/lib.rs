//! AWS integrations for bedrock-chat
//!
//! Each integration is behind a feature flag, all enabled by default:
//!
//! - `aws-bedrock`: [`aws_bedrock::AwsBedrock`] for chat and [`aws_bedrock::AwsBedrockCatalog`]
//!   for the foundation model catalog
//! - `aws-glue`: [`aws_glue::AwsGlue`] for Glue Data Catalog context
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "aws-bedrock")]
#[cfg_attr(docsrs, doc(cfg(feature = "aws-bedrock")))]
pub mod aws_bedrock;
#[cfg(feature = "aws-glue")]
#[cfg_attr(docsrs, doc(cfg(feature = "aws-glue")))]
pub mod aws_glue;
