use crate::schema_validator::SchemaValidator;
use mofa_kernel::structured_output::StructuredOutput;
use std::error::Error;

/// Executor for agents that handles structured output and retries.
pub struct AgentExecutor {
    schema_validator: SchemaValidator,
}

impl AgentExecutor {
    /// Creates a new `AgentExecutor` with the given schema validator.
    pub fn new(schema_str: &str) -> Result<Self, Box<dyn Error>> {
        let schema_validator = SchemaValidator::new(schema_str)?;
        Ok(AgentExecutor { schema_validator })
    }

    /// Executes an agent request and validates the response.
    pub async fn execute<T>(&self, prompt: &str, max_retries: usize) -> Result<T, Box<dyn Error>>
    where
        T: for<'de> serde::Deserialize<'de> + StructuredOutput,
    {
        let mut retries = 0;
        
        loop {
            // Placeholder for actual LLM call and response retrieval
            // For now, we assume a successful response
            let raw_response = "some raw JSON response";
            
            match self.schema_validator.validate(raw_response) {
                Ok(value) => {
                    return serde_json::from_value(value).map_err(|e| e.into());
                }
                Err(err) => {
                    if retries >= max_retries {
                        return Err(Box::new(std::io::Error::new(std::io::ErrorKind::Other, err)));
                    }
                    
                    // Send correction prompt and retry
                    retries += 1;
                    // Placeholder for sending correction prompt
                }
            }
        }
    }
}