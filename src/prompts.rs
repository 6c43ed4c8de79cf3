//! Instruction text sent alongside the diagram image.
//!
//! The pipeline treats the instruction as an opaque string. Two built-in
//! profiles exist; callers can replace either wholesale via
//! [`crate::config::PipelineConfig::instruction`].

use serde::{Deserialize, Serialize};

/// Terraform only, Tokyo-region provider, no prose around the code.
pub const BASIC_INSTRUCTION: &str = "Generate Terraform code from the attached architecture diagram.
Include only the AWS provider configuration for the Tokyo region (ap-northeast-1).
Output only Terraform code, with no text before or after it.
Do not wrap the output in ``` fences.
Add any resource blocks needed to connect the resources shown in the diagram.";

/// AMI every EC2 instance is pinned to under the conventions profile (Amazon Linux 2023).
pub const CONVENTIONS_EC2_AMI: &str = "ami-03f584e50b2d32776";

/// SSH key pair EC2 instances get under the conventions profile.
pub const CONVENTIONS_EC2_KEY_PAIR: &str = "hiyama-diagram";

/// Basic rules plus the house conventions for naming, tagging, EC2 and
/// security groups.
///
/// The AMI and key pair are fixed values of one account. Use
/// [`crate::config::PipelineConfig::instruction`] with edited text to target
/// another.
pub const CONVENTIONS_INSTRUCTION: &str = "Generate Terraform code from the attached architecture diagram.
Declare string variables aws_access_key_id and aws_secret_access_key and reference them in the provider block.
Write a provider block for the Tokyo region (ap-northeast-1).
Do not write a terraform block.
Output only Terraform code, with no text before or after it.
Do not wrap the output in ``` fences.
Omit parameters whose value would be the default anyway.
Do not include AWS service names in Terraform resource names.
When unsure what to name a resource, name it diagram.
Add any resource blocks needed to connect the resources shown in the diagram.
Tag every resource with Name = \"diagram-<service name>\".
Pin EC2 instances to AMI ami-03f584e50b2d32776 and put the comment \"# AL2023\" next to it.
Set key_name = \"hiyama-diagram\" on EC2 instances.
Give EC2 instances a public IP address.
Attach a security group to EC2 instances that allows SSH only.
Append the comment \"# adjust as needed\" to ingress cidr_blocks = [\"0.0.0.0/0\"].
Do not configure security group egress.";

/// Which built-in instruction to use when no override is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptProfile {
    Basic,
    #[default]
    Conventions,
}

impl PromptProfile {
    pub fn instruction(&self) -> &'static str {
        match self {
            PromptProfile::Basic => BASIC_INSTRUCTION,
            PromptProfile::Conventions => CONVENTIONS_INSTRUCTION,
        }
    }
}
