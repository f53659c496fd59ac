use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use plasmacore_common::EvaluatedTensor1;
use plasmacore_geometry::{Geometry, Mesh};
use plasmacore_transport::{
    CoefficientBuilder, CoreProfiles, DynamicParams, FiniteDifferenceJacobian, JacobianStrategy,
    SourceModel, SourceTerm, TransportCoeffs, TransportModel, VariableBoundaryConditions,
};

struct ConstTransport;
impl TransportModel for ConstTransport {
    fn compute(
        &self,
        profiles: &CoreProfiles,
        _geometry: &Geometry,
        _params: &DynamicParams,
    ) -> plasmacore_transport::Result<TransportCoeffs> {
        let n = profiles.n_cells();
        Ok(TransportCoeffs {
            chi_i: EvaluatedTensor1::ones(n),
            chi_e: EvaluatedTensor1::ones(n),
            d: EvaluatedTensor1::ones(n),
            v: EvaluatedTensor1::zeros(n),
        })
    }
}

struct NoSources;
impl SourceModel for NoSources {
    fn compute(
        &self,
        _profiles: &CoreProfiles,
        _geometry: &Geometry,
        _params: &DynamicParams,
    ) -> plasmacore_transport::Result<Vec<SourceTerm>> {
        Ok(Vec::new())
    }
}

fn bench_coefficient_build(c: &mut Criterion) {
    let n = 100;
    let mesh = Mesh::uniform(n).unwrap();
    let geometry = Geometry::circular(mesh, 6.2, 2.0, 5.3, 1.0, 3.0).unwrap();
    let profiles = CoreProfiles::new(
        EvaluatedTensor1::from_array(Array1::from_elem(n, 1000.0)),
        EvaluatedTensor1::from_array(Array1::from_elem(n, 1000.0)),
        EvaluatedTensor1::from_array(Array1::from_elem(n, 5e19)),
        EvaluatedTensor1::zeros(n),
    )
    .unwrap();
    let params = DynamicParams {
        boundary_conditions: VariableBoundaryConditions::typical(300.0, 300.0, 5e19, 0.0).unwrap(),
        dt: 1e-3,
        plasma_current: 1e6,
    };
    let transport = ConstTransport;
    let no_sources = NoSources;
    let sources: Vec<&dyn SourceModel> = vec![&no_sources];
    let builder = CoefficientBuilder {
        transport: &transport,
        sources: &sources,
        pedestal: None,
        mhd: None,
        neoclassical: None,
        dynamic_params: &params,
    };

    c.bench_function("coefficient_builder_build_n100", |b| {
        b.iter(|| black_box(builder.build(black_box(&profiles), black_box(&geometry)).unwrap()));
    });
}

fn bench_finite_difference_jacobian(c: &mut Criterion) {
    let n = 25;
    let len = 4 * n;
    let a_diag: Vec<f64> = (0..len).map(|i| 1.0 + i as f64 * 0.01).collect();
    let residual_fn = move |x: &Array1<f64>| {
        x.iter()
            .zip(a_diag.iter())
            .map(|(&xi, &ai)| ai * xi * xi)
            .collect::<Array1<f64>>()
    };
    let x0 = Array1::from_elem(len, 2.0);

    c.bench_function("finite_difference_jacobian_n25", |b| {
        b.iter(|| black_box(FiniteDifferenceJacobian.jacobian(black_box(&x0), &residual_fn)));
    });
}

criterion_group!(benches, bench_coefficient_build, bench_finite_difference_jacobian);
criterion_main!(benches);
