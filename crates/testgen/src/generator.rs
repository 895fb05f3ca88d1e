use chrono::{DateTime, Duration, Local};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use twopl_core::operation::Operation;
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
pub struct HistParams {
    pub id: u64,
    pub n_transaction: u64,
    pub n_page: u64,
    pub n_operation: u64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct History {
    params: HistParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    data: Vec<Operation>,
}

impl History {
    #[must_use]
    pub const fn new(
        params: HistParams,
        info: String,
        start: DateTime<Local>,
        end: DateTime<Local>,
        data: Vec<Operation>,
    ) -> Self {
        Self {
            params,
            info,
            start,
            end,
            data,
        }
    }

    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub const fn get_data(&self) -> &Vec<Operation> {
        &self.data
    }

    #[must_use]
    pub const fn get_params(&self) -> &HistParams {
        &self.params
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Page names used by generated histories: `p0`, `p1`, ...
#[must_use]
pub fn page_name(index: u64) -> String {
    format!("p{index}")
}

/// Generate a single history of `n_transaction` transactions, ids `1..=n`.
///
/// Each transaction issues `n_operation` reads or writes on random pages out
/// of `n_page`, followed by its commit. The per-transaction order is kept
/// while the transactions are interleaved at random.
///
/// Returns an empty history if `n_page` is zero.
#[must_use]
pub fn generate_single_history(n_transaction: u64, n_page: u64, n_operation: u64) -> Vec<Operation> {
    let Ok(page_range) = Uniform::new(0, n_page) else {
        return Vec::new();
    };
    let mut random_generator = rand::rng();

    let mut programs: Vec<Vec<Operation>> = (1..=n_transaction)
        .map(|transaction| {
            let mut program: Vec<Operation> = (0..n_operation)
                .map(|_| {
                    let page = page_name(page_range.sample(&mut random_generator));
                    if random_generator.random::<bool>() {
                        Operation::read(transaction, page)
                    } else {
                        Operation::write(transaction, page)
                    }
                })
                .collect();
            program.push(Operation::commit(transaction));
            // popped from the back below
            program.reverse();
            program
        })
        .collect();

    let mut history = Vec::new();
    while !programs.is_empty() {
        let Ok(pick) = Uniform::new(0, programs.len()) else {
            break;
        };
        let index = pick.sample(&mut random_generator);
        if let Some(operation) = programs[index].pop() {
            history.push(operation);
        }
        if programs[index].is_empty() {
            programs.swap_remove(index);
        }
    }
    history
}

#[must_use]
pub fn generate_mult_histories(
    n_hist: u64,
    n_transaction: u64,
    n_page: u64,
    n_operation: u64,
) -> Vec<History> {
    (0..n_hist)
        .into_par_iter()
        .map(|i_hist| {
            let start_time = Local::now();
            let hist = generate_single_history(n_transaction, n_page, n_operation);
            let end_time = Local::now();
            History {
                params: HistParams::builder()
                    .id(i_hist)
                    .n_transaction(n_transaction)
                    .n_page(n_page)
                    .n_operation(n_operation)
                    .build(),
                info: "generated".to_string(),
                start: start_time,
                end: end_time,
                data: hist,
            }
        })
        .collect()
}
