// Copyright 2025 Dynsql Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Render throughput benchmarks
//!
//! Run with: cargo bench --bench render
//!
//! Covers the common statement shapes:
//! 1. Static SQL with a single bind parameter
//! 2. Conditional where clause with several optional filters
//! 3. IN list built by foreach (10 and 1000 elements)
//! 4. Fragment includes
//! 5. Document loading

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dynsql::{named_params, Engine, StatementRegistry};
use std::hint::black_box;

const MAPPER: &str = r#"
<mapper namespace="users">
  <sql id="columns">id, name, email, age, balance, active, created_at</sql>

  <select id="byId">SELECT <include refid="columns"/> FROM users WHERE id = #{id}</select>

  <select id="search">
    SELECT <include refid="columns"/> FROM users
    <where>
      <if test="name != null and name != ''">AND name = #{name}</if>
      <if test="minAge != null">AND age &gt;= #{minAge}</if>
      <if test="maxAge != null">AND age &lt;= #{maxAge}</if>
      <if test="active != null">AND active = #{active}</if>
    </where>
    <choose>
      <when test="sort == 'age'">ORDER BY age DESC</when>
      <otherwise>ORDER BY id</otherwise>
    </choose>
  </select>

  <select id="byIds">
    SELECT <include refid="columns"/> FROM users WHERE id IN
    <foreach collection="ids" open="(" separator="," close=")">#{item}</foreach>
  </select>
</mapper>
"#;

fn bench_static(c: &mut Criterion) {
    let engine = Engine::from_xml(MAPPER).unwrap();
    let params = named_params! { id: 42 };

    c.bench_function("render/by_id", |b| {
        b.iter(|| black_box(engine.render("users.byId", &params).unwrap()))
    });
}

fn bench_dynamic_where(c: &mut Criterion) {
    let engine = Engine::from_xml(MAPPER).unwrap();
    let mut group = c.benchmark_group("render/search");

    let none = named_params! { sort: "id" };
    let all = named_params! {
        name: "User_1",
        minAge: 18,
        maxAge: 65,
        active: true,
        sort: "age",
    };

    group.bench_function("no_filters", |b| {
        b.iter(|| black_box(engine.render("users.search", &none).unwrap()))
    });
    group.bench_function("all_filters", |b| {
        b.iter(|| black_box(engine.render("users.search", &all).unwrap()))
    });
    group.finish();
}

fn bench_foreach(c: &mut Criterion) {
    let engine = Engine::from_xml(MAPPER).unwrap();
    let mut group = c.benchmark_group("render/in_list");

    for size in [10i64, 1000] {
        let params = named_params! { ids: (1..=size).collect::<Vec<i64>>() };
        group.bench_with_input(BenchmarkId::from_parameter(size), &params, |b, params| {
            b.iter(|| black_box(engine.render("users.byIds", params).unwrap()))
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    c.bench_function("load/mapper", |b| {
        b.iter(|| {
            let mut registry = StatementRegistry::new();
            black_box(registry.load_str(black_box(MAPPER)).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_static,
    bench_dynamic_where,
    bench_foreach,
    bench_load
);
criterion_main!(benches);
