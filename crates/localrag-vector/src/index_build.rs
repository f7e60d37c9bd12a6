use anyhow::Result;
use lancedb::index::{vector::IvfPqIndexBuilder, Index};
use lancedb::{DistanceType, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvfPqParams {
    pub nlist: usize,
    pub m: usize,
}

pub fn compute_ivfpq_params(total_rows: usize, dim: usize) -> IvfPqParams {
    let sqrt_n = (total_rows as f64).sqrt() as usize;
    let mut nlist = std::cmp::max(2048, 2 * sqrt_n);
    nlist = std::cmp::min(nlist, 65536);
    // Small collections: keep at least 8 rows per partition
    nlist = std::cmp::min(nlist, std::cmp::max(1, total_rows / 8));
    // sub-vectors must divide the dimension
    let target = if dim >= 1024 { 32 } else { 16 };
    let m = (1..=target).rev().find(|m| dim % m == 0).unwrap_or(1);
    IvfPqParams { nlist, m }
}

pub async fn build_ivfpq_index(table: &Table, index_name: &str, params: &IvfPqParams) -> Result<()> {
    table
        .create_index(
            &["vector"],
            Index::IvfPq(
                IvfPqIndexBuilder::default()
                    .distance_type(DistanceType::Cosine)
                    .num_partitions(params.nlist as u32)
                    .num_sub_vectors(params.m as u32),
            ),
        )
        .name(index_name.to_string())
        .execute()
        .await?;
    Ok(())
}
