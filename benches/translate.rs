use criterion::{criterion_group, criterion_main, Criterion};

use mongo_dbapi::params::{ParameterSet, Value};
use mongo_dbapi::translation::parse_sql;

fn bench_translate(c: &mut Criterion) {
    let mut g = c.benchmark_group("translate");

    g.bench_function("point_select", |b| {
        let params = ParameterSet::positional([Value::Int(25)]);
        b.iter(|| parse_sql("SELECT * FROM orders WHERE id = %s", &params).unwrap());
    });

    g.bench_function("inner_join", |b| {
        let params = ParameterSet::Empty;
        b.iter(|| {
            parse_sql(
                "SELECT u.name, o.total FROM users u INNER JOIN orders o ON u.id = o.user_id WHERE u.active = true",
                &params,
            )
            .unwrap()
        });
    });

    g.bench_function("group_by_aggregation", |b| {
        let params = ParameterSet::Empty;
        b.iter(|| {
            parse_sql(
                "SELECT category, COUNT(*), AVG(amount) FROM orders GROUP BY category HAVING COUNT(*) > 1",
                &params,
            )
            .unwrap()
        });
    });

    g.bench_function("derived_table_subquery", |b| {
        let params = ParameterSet::Empty;
        b.iter(|| {
            parse_sql(
                "SELECT id, val FROM (SELECT id, val FROM orders WHERE category = 1) AS sub WHERE id < 20",
                &params,
            )
            .unwrap()
        });
    });

    g.finish();
}

criterion_group!(benches, bench_translate);
criterion_main!(benches);
