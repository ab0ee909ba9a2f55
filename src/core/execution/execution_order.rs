use crate::core::error::{Result, SimError};

/// Topological staging of a structural part's children for the parallel strategy
pub struct ExecutionOrderBuilder;

impl ExecutionOrderBuilder {
    /// Group children into stages with a modified Kahn's algorithm.
    ///
    /// Children in one stage have no wiring between them and may run
    /// concurrently. Each stage is sorted by declaration index so the
    /// result is deterministic.
    ///
    /// # Arguments
    /// * `count` - Number of children
    /// * `edges` - Child-to-child wiring as `(source, destination)` indices
    /// * `names` - Child identifiers, used in the cycle error message
    pub fn build_stages(count: usize, edges: &[(usize, usize)], names: &[&str]) -> Result<Vec<Vec<usize>>> {
        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut in_degree: Vec<usize> = vec![0; count];

        for &(source, destination) in edges {
            if source >= count || destination >= count {
                continue;
            }
            adj_list[source].push(destination);
            in_degree[destination] += 1;
        }

        let mut processed = vec![false; count];
        let mut processed_count = 0;
        let mut stages = Vec::new();

        while processed_count < count {
            let current_stage: Vec<usize> = (0..count)
                .filter(|&i| !processed[i] && in_degree[i] == 0)
                .collect();

            if current_stage.is_empty() {
                let remaining: Vec<&str> = (0..count)
                    .filter(|&i| !processed[i])
                    .map(|i| names.get(i).copied().unwrap_or("?"))
                    .collect();
                return Err(SimError::DependencyCycle(remaining.join(", ")));
            }

            for &index in &current_stage {
                processed[index] = true;
                processed_count += 1;
                for &neighbor in &adj_list[index] {
                    in_degree[neighbor] -= 1;
                }
            }

            stages.push(current_stage);
        }

        Ok(stages)
    }

    /// Flattened stage order
    pub fn build_order(count: usize, edges: &[(usize, usize)], names: &[&str]) -> Result<Vec<usize>> {
        let stages = Self::build_stages(count, edges, names)?;
        Ok(stages.into_iter().flatten().collect())
    }
}
